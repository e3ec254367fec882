//! Type instance notifications on `type_instances_changes`.
//!
//! A type instance is a typed object at a section offset. An expression
//! type instance is a cross reference from one operand expression to such
//! an instance.

use navi_core::{Address, ExpressionId, ModuleId, TypeInstanceId};
use serde::Serialize;

use crate::error::NotifyError;
use crate::grammar::{int, ops, seq, Grammar, ANY_OP};
use crate::operand::{locate, NodeIndex};
use crate::resolver::ModelResolver;
use crate::table::{Channel, Operation, TableName};

/// A parsed type instance notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TypeInstanceRecord {
    /// `bn_type_instances`
    Instance {
        operation: Operation,
        module: ModuleId,
        instance: TypeInstanceId,
    },
    /// `bn_expression_type_instances`
    Reference {
        operation: Operation,
        module: ModuleId,
        address: Address,
        position: u32,
        expression: ExpressionId,
        instance: TypeInstanceId,
    },
}

impl TypeInstanceRecord {
    pub fn module(&self) -> ModuleId {
        match *self {
            TypeInstanceRecord::Instance { module, .. }
            | TypeInstanceRecord::Reference { module, .. } => module,
        }
    }
}

/// A resolved type instance change.
///
/// Load and reload read the instance row when applied, so informers may
/// fail with [`NotifyError::Load`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TypeInstanceEvent {
    Load {
        module: ModuleId,
        instance: TypeInstanceId,
    },
    Reload {
        module: ModuleId,
        instance: TypeInstanceId,
    },
    Delete {
        module: ModuleId,
        instance: TypeInstanceId,
    },
    /// Load a new reference. `node` is the operand node to bind it to,
    /// absent when the instruction is not loaded.
    LoadReference {
        module: ModuleId,
        instance: TypeInstanceId,
        address: Address,
        position: u32,
        expression: ExpressionId,
        node: Option<NodeIndex>,
    },
    DeleteReference {
        module: ModuleId,
        instance: TypeInstanceId,
        address: Address,
        position: u32,
        expression: ExpressionId,
    },
}

/// Parser for the type instance channel.
#[derive(Debug, Clone)]
pub struct TypeInstanceParser {
    instances: Grammar,
    references: Grammar,
}

impl TypeInstanceParser {
    pub fn new() -> Result<Self, NotifyError> {
        Ok(Self {
            instances: Grammar::new(
                TableName::TypeInstances,
                &seq(&[ops(ANY_OP), int("module"), int("instance")]),
            )?,
            references: Grammar::new(
                TableName::ExpressionTypeInstances,
                &seq(&[
                    ops(ANY_OP),
                    int("module"),
                    int("address"),
                    int("position"),
                    int("expression"),
                    int("instance"),
                ]),
            )?,
        })
    }

    pub fn parse(&self, table: TableName, line: &str) -> Result<TypeInstanceRecord, NotifyError> {
        match table {
            TableName::TypeInstances => {
                let f = self.instances.fields(line)?;
                Ok(TypeInstanceRecord::Instance {
                    operation: f.operation()?,
                    module: f.get("module")?,
                    instance: f.get("instance")?,
                })
            }
            TableName::ExpressionTypeInstances => {
                let f = self.references.fields(line)?;
                Ok(TypeInstanceRecord::Reference {
                    operation: f.operation()?,
                    module: f.get("module")?,
                    address: f.get("address")?,
                    position: f.get("position")?,
                    expression: f.get("expression")?,
                    instance: f.get("instance")?,
                })
            }
            other => Err(NotifyError::Unsupported {
                table: other.as_str(),
                channel: Channel::TypeInstances.name(),
            }),
        }
    }

    pub fn resolve<M: ModelResolver + ?Sized>(
        &self,
        record: &TypeInstanceRecord,
        model: &M,
    ) -> Result<Vec<TypeInstanceEvent>, NotifyError> {
        if !model.is_module_loaded(record.module()) {
            return Ok(Vec::new());
        }
        let event = match *record {
            TypeInstanceRecord::Instance {
                operation,
                module,
                instance,
            } => match operation {
                Operation::Insert => TypeInstanceEvent::Load { module, instance },
                Operation::Update => TypeInstanceEvent::Reload { module, instance },
                Operation::Delete => TypeInstanceEvent::Delete { module, instance },
            },
            TypeInstanceRecord::Reference {
                operation,
                module,
                address,
                position,
                expression,
                instance,
            } => match operation {
                Operation::Insert => TypeInstanceEvent::LoadReference {
                    module,
                    instance,
                    address,
                    position,
                    expression,
                    node: locate(model, module, address, position, expression),
                },
                // References only ever map ids to ids.
                Operation::Update => return Ok(Vec::new()),
                Operation::Delete => TypeInstanceEvent::DeleteReference {
                    module,
                    instance,
                    address,
                    position,
                    expression,
                },
            },
        };
        Ok(vec![event])
    }
}
