//! View notifications on `view_changes`.
//!
//! `bn_views` rows change view attributes. `bn_module_views` and
//! `bn_project_views` rows map a view to its owner, so inserting or
//! deleting one adds or removes the view itself.

use navi_core::{ModuleId, ProjectId, ViewId};
use serde::Serialize;
use tracing::debug;

use crate::error::NotifyError;
use crate::grammar::{int, ops, seq, Grammar, ANY_OP};
use crate::resolver::{DataLoader, ModelResolver, ViewConfiguration, ViewOwner};
use crate::table::{Channel, Operation, TableName};

/// A parsed view notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ViewRecord {
    /// `bn_views`
    View { operation: Operation, view: ViewId },
    /// `bn_module_views` or `bn_project_views`
    Owned {
        operation: Operation,
        view: ViewId,
        owner: ViewOwner,
    },
}

impl ViewRecord {
    pub fn module(&self) -> Option<ModuleId> {
        match *self {
            ViewRecord::Owned {
                owner: ViewOwner::Module(module),
                ..
            } => Some(module),
            _ => None,
        }
    }
}

/// Attributes that differ between the loaded view and its row. The
/// modification date is always taken from the row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ViewChanges {
    pub name: Option<String>,
    pub description: Option<String>,
    pub starred: Option<bool>,
    pub modified_at: i64,
}

impl ViewChanges {
    /// Compares a loaded configuration against a freshly loaded one.
    pub fn between(local: &ViewConfiguration, fresh: &ViewConfiguration) -> Self {
        Self {
            name: (local.name != fresh.name).then(|| fresh.name.clone()),
            description: (local.description != fresh.description)
                .then(|| fresh.description.clone()),
            starred: (local.starred != fresh.starred).then_some(fresh.starred),
            modified_at: fresh.modified_at,
        }
    }
}

/// A resolved view change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum ViewEvent {
    Updated { view: ViewId, changes: ViewChanges },
    /// A view generated from freshly loaded graph data.
    Added {
        owner: ViewOwner,
        view: ViewId,
        configuration: ViewConfiguration,
    },
    Removed { owner: ViewOwner, view: ViewId },
}

/// Parser for the views channel.
#[derive(Debug, Clone)]
pub struct ViewParser {
    views: Grammar,
    module_views: Grammar,
    project_views: Grammar,
}

impl ViewParser {
    pub fn new() -> Result<Self, NotifyError> {
        Ok(Self {
            views: Grammar::new(TableName::Views, &seq(&[ops(ANY_OP), int("view")]))?,
            module_views: Grammar::new(
                TableName::ModuleViews,
                &seq(&[ops(ANY_OP), int("view"), int("owner")]),
            )?,
            project_views: Grammar::new(
                TableName::ProjectViews,
                &seq(&[ops(ANY_OP), int("view"), int("owner")]),
            )?,
        })
    }

    pub fn parse(&self, table: TableName, line: &str) -> Result<ViewRecord, NotifyError> {
        match table {
            TableName::Views => {
                let f = self.views.fields(line)?;
                Ok(ViewRecord::View {
                    operation: f.operation()?,
                    view: f.get("view")?,
                })
            }
            TableName::ModuleViews => {
                let f = self.module_views.fields(line)?;
                Ok(ViewRecord::Owned {
                    operation: f.operation()?,
                    view: f.get("view")?,
                    owner: ViewOwner::Module(f.get::<ModuleId>("owner")?),
                })
            }
            TableName::ProjectViews => {
                let f = self.project_views.fields(line)?;
                Ok(ViewRecord::Owned {
                    operation: f.operation()?,
                    view: f.get("view")?,
                    owner: ViewOwner::Project(f.get::<ProjectId>("owner")?),
                })
            }
            other => Err(NotifyError::Unsupported {
                table: other.as_str(),
                channel: Channel::Views.name(),
            }),
        }
    }

    pub fn resolve<M, L>(
        &self,
        record: &ViewRecord,
        model: &M,
        loader: &L,
    ) -> Result<Vec<ViewEvent>, NotifyError>
    where
        M: ModelResolver + ?Sized,
        L: DataLoader + ?Sized,
    {
        match *record {
            // Inserts and deletes of bare views do not say who owns the
            // view; the owner tables notify for those.
            ViewRecord::View {
                operation: Operation::Update,
                view,
            } => {
                let Some(local) = model.view(view) else {
                    return Ok(Vec::new());
                };
                let Some(fresh) = loader.load_view_configuration(local.owner, view)? else {
                    debug!(%view, "view row vanished");
                    return Ok(Vec::new());
                };
                let changes = ViewChanges::between(&local.configuration, &fresh);
                Ok(vec![ViewEvent::Updated { view, changes }])
            }
            ViewRecord::View { .. } => Ok(Vec::new()),
            ViewRecord::Owned {
                operation,
                view,
                owner,
            } => {
                if !owner_loaded(model, owner) {
                    return Ok(Vec::new());
                }
                match operation {
                    Operation::Insert => {
                        let Some(configuration) = loader.load_view_configuration(owner, view)?
                        else {
                            debug!(%view, "new view row vanished");
                            return Ok(Vec::new());
                        };
                        Ok(vec![ViewEvent::Added {
                            owner,
                            view,
                            configuration,
                        }])
                    }
                    Operation::Update => Ok(Vec::new()),
                    Operation::Delete => Ok(vec![ViewEvent::Removed { owner, view }]),
                }
            }
        }
    }
}

fn owner_loaded<M: ModelResolver + ?Sized>(model: &M, owner: ViewOwner) -> bool {
    match owner {
        ViewOwner::Module(module) => model.is_module_loaded(module),
        ViewOwner::Project(project) => model.is_project_loaded(project),
    }
}
