//! Routes notification lines to their parsers and applies the results.
//!
//! The table name (first token) selects the parser. The channel a line
//! arrived on decides between the two shapes of `bn_functions` and
//! `bn_type_instances`: on `comment_changes` they carry a comment id, on
//! their own channels they do not. Resolved events are applied through
//! the informer while holding the locks of every module they touch.

use navi_core::ModuleId;
use serde::Serialize;
use tracing::{debug, warn};

use crate::comment::{CommentEvent, CommentParser, CommentRecord};
use crate::error::NotifyError;
use crate::function::{FunctionEvent, FunctionParser, FunctionRecord};
use crate::locks::ModuleLocks;
use crate::resolver::{DataLoader, Informer, ModelResolver};
use crate::table::{Channel, TableName};
use crate::type_instance::{TypeInstanceEvent, TypeInstanceParser, TypeInstanceRecord};
use crate::types::{TypeEvent, TypeParser, TypeRecord};
use crate::view::{ViewEvent, ViewParser, ViewRecord};

/// A parsed notification of any table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum Record {
    Comment(CommentRecord),
    Function(FunctionRecord),
    TypeInstance(TypeInstanceRecord),
    Type(TypeRecord),
    View(ViewRecord),
}

impl Record {
    /// The modules whose locks guard applying this record. Empty for
    /// records that name no module.
    pub fn modules(&self) -> Vec<ModuleId> {
        match self {
            Record::Comment(r) => r.modules(),
            Record::Function(r) => vec![r.module],
            Record::TypeInstance(r) => vec![r.module()],
            Record::Type(r) => vec![r.module()],
            Record::View(r) => r.module().into_iter().collect(),
        }
    }
}

/// A resolved change to the loaded model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum Event {
    Comment(CommentEvent),
    Function(FunctionEvent),
    TypeInstance(TypeInstanceEvent),
    Type(TypeEvent),
    View(ViewEvent),
}

/// Outcome of one batch.
#[derive(Debug, Default)]
pub struct BatchReport {
    /// Events applied, in order. Includes events applied before a later
    /// event of the same notification failed.
    pub events: Vec<Event>,
    /// Notifications that failed with a recoverable error.
    pub failures: Vec<(String, NotifyError)>,
    /// The fatal error that stopped the batch, if any.
    pub aborted: Option<NotifyError>,
}

impl BatchReport {
    pub fn is_aborted(&self) -> bool {
        self.aborted.is_some()
    }
}

/// Events applied for one line, and the error that stopped it.
struct Routed {
    applied: Vec<Event>,
    error: Option<NotifyError>,
}

impl Routed {
    fn failed(error: NotifyError) -> Self {
        Self {
            applied: Vec::new(),
            error: Some(error),
        }
    }
}

/// Holds one parser per channel.
#[derive(Debug, Clone)]
pub struct Dispatcher {
    comments: CommentParser,
    functions: FunctionParser,
    type_instances: TypeInstanceParser,
    types: TypeParser,
    views: ViewParser,
    locks: ModuleLocks,
}

impl Dispatcher {
    /// Compiles every grammar.
    pub fn new() -> Result<Self, NotifyError> {
        Self::with_locks(ModuleLocks::new())
    }

    /// Shares `locks` with other writers of the model.
    pub fn with_locks(locks: ModuleLocks) -> Result<Self, NotifyError> {
        Ok(Self {
            comments: CommentParser::new()?,
            functions: FunctionParser::new()?,
            type_instances: TypeInstanceParser::new()?,
            types: TypeParser::new()?,
            views: ViewParser::new()?,
            locks,
        })
    }

    pub fn locks(&self) -> &ModuleLocks {
        &self.locks
    }

    /// The channel a line would have arrived on. `None` for unknown
    /// tables.
    pub fn channel_of(line: &str) -> Option<Channel> {
        let table = TableName::of_line(line)?;
        let tokens = line.split_whitespace().count();
        let channel = match table {
            TableName::Functions if tokens == 4 => Channel::Functions,
            TableName::TypeInstances if tokens == 4 => Channel::TypeInstances,
            _ => Channel::ALL.into_iter().find(|c| c.carries(table))?,
        };
        Some(channel)
    }

    /// Parses a line that arrived on `channel`. Unknown tables are logged
    /// and yield `None`.
    pub fn parse(&self, channel: Channel, line: &str) -> Result<Option<Record>, NotifyError> {
        let Some(table) = TableName::of_line(line) else {
            warn!(%channel, "table name of notification '{}' not known", line);
            return Ok(None);
        };
        if !channel.carries(table) {
            return Err(NotifyError::Unsupported {
                table: table.as_str(),
                channel: channel.name(),
            });
        }
        let record = match channel {
            Channel::Comments => Record::Comment(self.comments.parse(table, line)?),
            Channel::Functions => Record::Function(self.functions.parse(table, line)?),
            Channel::TypeInstances => {
                Record::TypeInstance(self.type_instances.parse(table, line)?)
            }
            Channel::Types => Record::Type(self.types.parse(table, line)?),
            Channel::Views => Record::View(self.views.parse(table, line)?),
        };
        Ok(Some(record))
    }

    /// Resolves a record without applying it.
    pub fn resolve<W>(&self, record: &Record, model: &W) -> Result<Vec<Event>, NotifyError>
    where
        W: ModelResolver + DataLoader + ?Sized,
    {
        let events = match record {
            Record::Comment(r) => wrap(self.comments.resolve(r, model)?, Event::Comment),
            Record::Function(r) => wrap(self.functions.resolve(r, model, model)?, Event::Function),
            Record::TypeInstance(r) => {
                wrap(self.type_instances.resolve(r, model)?, Event::TypeInstance)
            }
            Record::Type(r) => wrap(self.types.resolve(r, model, model)?, Event::Type),
            Record::View(r) => wrap(self.views.resolve(r, model, model)?, Event::View),
        };
        Ok(events)
    }

    /// Parses, resolves and applies one line, inferring its channel.
    pub fn route<W>(&self, line: &str, model: &mut W) -> Result<Vec<Event>, NotifyError>
    where
        W: ModelResolver + DataLoader + Informer + ?Sized,
    {
        match Self::channel_of(line) {
            Some(channel) => self.route_on(channel, line, model),
            None => {
                warn!("table name of notification '{}' not known", line);
                Ok(Vec::new())
            }
        }
    }

    /// Parses, resolves and applies one line that arrived on `channel`.
    ///
    /// Events are applied in order. If an informer call fails, the events
    /// before it stay applied; [`dispatch_batch`](Self::dispatch_batch)
    /// reports them.
    pub fn route_on<W>(
        &self,
        channel: Channel,
        line: &str,
        model: &mut W,
    ) -> Result<Vec<Event>, NotifyError>
    where
        W: ModelResolver + DataLoader + Informer + ?Sized,
    {
        let routed = self.route_line(channel, line, model);
        match routed.error {
            Some(err) => Err(err),
            None => Ok(routed.applied),
        }
    }

    fn route_line<W>(&self, channel: Channel, line: &str, model: &mut W) -> Routed
    where
        W: ModelResolver + DataLoader + Informer + ?Sized,
    {
        let record = match self.parse(channel, line) {
            Ok(Some(record)) => record,
            Ok(None) => {
                return Routed {
                    applied: Vec::new(),
                    error: None,
                }
            }
            Err(err) => return Routed::failed(err),
        };
        self.locks.with_locks(&record.modules(), || {
            let events = match self.resolve(&record, &*model) {
                Ok(events) => events,
                Err(err) => return Routed::failed(err),
            };
            if events.is_empty() {
                debug!(%channel, "notification '{}' concerns nothing loaded", line);
            }
            let mut applied = Vec::with_capacity(events.len());
            for event in events {
                if let Err(err) = apply(model, &event) {
                    return Routed {
                        applied,
                        error: Some(err),
                    };
                }
                applied.push(event);
            }
            Routed {
                applied,
                error: None,
            }
        })
    }

    /// Routes every line of one channel's batch.
    ///
    /// A recoverable failure is logged and recorded and the batch goes
    /// on. A fatal failure stops the batch and is kept in
    /// [`BatchReport::aborted`]; events applied up to that point are
    /// still reported.
    pub fn dispatch_batch<W, I, S>(&self, channel: Channel, lines: I, model: &mut W) -> BatchReport
    where
        W: ModelResolver + DataLoader + Informer + ?Sized,
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut report = BatchReport::default();
        for line in lines {
            let line = line.as_ref();
            let routed = self.route_line(channel, line, model);
            report.events.extend(routed.applied);
            match routed.error {
                None => {}
                Some(err) if err.is_fatal() => {
                    report.aborted = Some(err);
                    break;
                }
                Some(err) => {
                    warn!(%channel, "could not process notification '{}': {}", line, err);
                    report.failures.push((line.to_string(), err));
                }
            }
        }
        report
    }
}

fn wrap<T>(events: Vec<T>, f: fn(T) -> Event) -> Vec<Event> {
    events.into_iter().map(f).collect()
}

fn apply<W: Informer + ?Sized>(model: &mut W, event: &Event) -> Result<(), NotifyError> {
    match event {
        Event::Comment(e) => model.inform_comment(e),
        Event::Function(e) => model.inform_function(e),
        Event::TypeInstance(e) => model.inform_type_instance(e),
        Event::Type(e) => model.inform_type(e),
        Event::View(e) => model.inform_view(e),
    }
}

// ── tests ───────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use std::sync::mpsc;
    use std::thread;
    use std::time::Duration;

    use navi_core::{Address, BaseTypeId, CommentId, EdgeId, TypeInstanceId};

    use super::*;
    use crate::comment::{CommentAction, CommentScope, CommentTarget};
    use crate::resolver::FunctionData;
    use crate::testing::MockModel;

    fn dispatcher() -> Dispatcher {
        Dispatcher::new().unwrap()
    }

    #[test]
    fn edit_of_matching_comment_produces_one_event() {
        let mut model = MockModel::default().with_comment(6572, Some(6571), 1, "foo");
        let events = dispatcher()
            .route("bn_comments UPDATE 6572 6571 1 foo", &mut model)
            .unwrap();
        assert_eq!(events.len(), 1);
        assert!(matches!(
            events[0],
            Event::Comment(CommentEvent::Comment {
                action: CommentAction::Edit,
                ..
            })
        ));
        assert_eq!(model.informed, events);
    }

    #[test]
    fn edit_after_parent_diverged_is_violation() {
        let mut model = MockModel::default().with_comment(6572, Some(6571), 1, "foo");
        model
            .comments
            .get_mut(&CommentId(6572))
            .unwrap()
            .parent = Some(CommentId(1));
        let err = dispatcher()
            .route("bn_comments UPDATE 6572 6571 1 foo", &mut model)
            .unwrap_err();
        assert!(matches!(err, NotifyError::ConsistencyViolation { .. }), "got: {err}");
        assert!(err.is_fatal());
        assert!(model.informed.is_empty());
    }

    #[test]
    fn global_edge_delete_with_no_edges() {
        let mut model = MockModel::default().with_module(1);
        let events = dispatcher()
            .route("bn_global_edge_comments DELETE 1 1 100 200", &mut model)
            .unwrap();
        assert!(events.is_empty());
    }

    #[test]
    fn global_edge_insert_fans_out_to_both_edges() {
        let mut model = MockModel::default()
            .with_module(1)
            .with_edge(10, (1, 1), 100, 200)
            .with_edge(11, (1, 1), 100, 200);
        let events = dispatcher()
            .route("bn_global_edge_comments INSERT 1 1 100 200 55", &mut model)
            .unwrap();
        assert_eq!(
            events,
            vec![
                Event::Comment(CommentEvent::Thread {
                    target: CommentTarget::Edge(EdgeId(10)),
                    scope: CommentScope::Global,
                    action: CommentAction::Append,
                    comment: Some(CommentId(55)),
                }),
                Event::Comment(CommentEvent::Thread {
                    target: CommentTarget::Edge(EdgeId(11)),
                    scope: CommentScope::Global,
                    action: CommentAction::Append,
                    comment: Some(CommentId(55)),
                }),
            ]
        );
        assert_eq!(model.informed.len(), 2);
    }

    #[test]
    fn malformed_line_is_fatal() {
        let mut model = MockModel::default();
        for line in [
            "bn_global_edge_comments INSERT 1 1 100",
            "bn_views UPDATE seven",
            "bn_base_types INSERT 1",
        ] {
            let err = dispatcher().route(line, &mut model).unwrap_err();
            assert!(matches!(err, NotifyError::Malformed { .. }), "{line}: {err}");
        }
    }

    #[test]
    fn unknown_table_is_skipped() {
        let mut model = MockModel::default();
        let events = dispatcher()
            .route("bn_sections UPDATE 1 2", &mut model)
            .unwrap();
        assert!(events.is_empty());
        let events = dispatcher()
            .route_on(Channel::Types, "bn_sections UPDATE 1 2", &mut model)
            .unwrap();
        assert!(events.is_empty());
    }

    #[test]
    fn table_on_wrong_channel_is_unsupported() {
        let mut model = MockModel::default();
        let err = dispatcher()
            .route_on(Channel::Types, "bn_views UPDATE 1", &mut model)
            .unwrap_err();
        assert!(matches!(
            err,
            NotifyError::Unsupported {
                table: "bn_views",
                channel: "types_changes"
            }
        ));
    }

    #[test]
    fn channel_inference_by_shape() {
        assert_eq!(
            Dispatcher::channel_of("bn_functions UPDATE 2 4096"),
            Some(Channel::Functions)
        );
        assert_eq!(
            Dispatcher::channel_of("bn_functions UPDATE 2 4096 null"),
            Some(Channel::Comments)
        );
        assert_eq!(
            Dispatcher::channel_of("bn_type_instances DELETE 1 94"),
            Some(Channel::TypeInstances)
        );
        assert_eq!(
            Dispatcher::channel_of("bn_type_instances UPDATE 1 94 7"),
            Some(Channel::Comments)
        );
        assert_eq!(
            Dispatcher::channel_of("bn_expression_types DELETE 1 2 3 4"),
            Some(Channel::Types)
        );
        assert_eq!(Dispatcher::channel_of("bn_project_views INSERT 1 2"), Some(Channel::Views));
        assert_eq!(Dispatcher::channel_of("nothing here"), None);
        assert_eq!(Dispatcher::channel_of(""), None);
    }

    #[test]
    fn function_insert_is_ignored_every_time() {
        let mut model = MockModel::default().with_module(2);
        model.functions.insert(
            (ModuleId(2), Address(4096)),
            FunctionData {
                name: "f".into(),
                description: String::new(),
                stack_frame: None,
                prototype: Some(BaseTypeId(1)),
                forwarded_to: None,
            },
        );
        let d = dispatcher();
        for _ in 0..2 {
            assert!(d.route("bn_functions INSERT 2 4096", &mut model).unwrap().is_empty());
            assert!(d.route("bn_functions DELETE 2 4096", &mut model).unwrap().is_empty());
        }
        assert!(model.informed.is_empty());
    }

    #[test]
    fn type_instance_reload_is_idempotent() {
        let mut model = MockModel::default().with_module(1);
        let d = dispatcher();
        let first = d.route("bn_type_instances UPDATE 1 94", &mut model).unwrap();
        let second = d.route("bn_type_instances UPDATE 1 94", &mut model).unwrap();
        assert_eq!(first, second);
        assert_eq!(
            first,
            vec![Event::TypeInstance(TypeInstanceEvent::Reload {
                module: ModuleId(1),
                instance: TypeInstanceId(94),
            })]
        );
    }

    #[test]
    fn batch_isolates_recoverable_failures() {
        let mut model = MockModel::default().with_module(2).with_instruction(2, 64);
        let mut tree = crate::operand::OperandTree::new();
        tree.set_root(navi_core::ExpressionId(5), "eax");
        model.operands.insert((ModuleId(2), Address(64), 0), tree);

        let report = dispatcher()
            .dispatch_batch(
                Channel::Types,
                [
                    "bn_expression_types UPDATE 2 64 0 5",
                    "bn_base_types INSERT 2 3",
                ],
                &mut model,
            );
        assert!(!report.is_aborted());
        assert_eq!(report.failures.len(), 1);
        assert!(matches!(report.failures[0].1, NotifyError::Load { .. }));
        assert_eq!(report.events.len(), 1);
        assert_eq!(model.informed, report.events);
    }

    #[test]
    fn batch_stops_on_fatal_error() {
        let mut model = MockModel::default().with_module(2);
        let report = dispatcher().dispatch_batch(
            Channel::Types,
            vec![
                "bn_base_types INSERT 2 3".to_string(),
                "bn_base_types INSERT 2".to_string(),
                "bn_base_types INSERT 2 4".to_string(),
            ],
            &mut model,
        );
        let err = report.aborted.as_ref().unwrap();
        assert!(err.is_fatal(), "got: {err}");
        assert_eq!(report.events.len(), 1);
        assert_eq!(model.informed, report.events);
    }

    #[test]
    fn informer_failure_is_recorded() {
        let mut model = MockModel::default().with_module(2);
        model.failing_informer = true;
        let report = dispatcher()
            .dispatch_batch(Channel::Types, ["bn_types DELETE 2 1"], &mut model);
        assert_eq!(report.failures.len(), 1);
        assert!(report.events.is_empty());
    }

    #[test]
    fn informer_failure_mid_fan_out_reports_applied_events() {
        let mut model = MockModel::default()
            .with_module(1)
            .with_edge(10, (1, 1), 100, 200)
            .with_edge(11, (1, 1), 100, 200);
        model.accept_limit = Some(1);
        let line = "bn_global_edge_comments INSERT 1 1 100 200 55";
        let report = dispatcher().dispatch_batch(Channel::Comments, [line], &mut model);

        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].0, line);
        assert_eq!(report.events.len(), 1);
        assert_eq!(model.informed, report.events);
        assert!(matches!(
            &report.events[0],
            Event::Comment(CommentEvent::Thread {
                target: CommentTarget::Edge(EdgeId(10)),
                ..
            })
        ));
    }

    #[test]
    fn applying_takes_module_lock() {
        let mut model = MockModel::default().with_module(3);
        let d = dispatcher();
        d.route("bn_base_types DELETE 3 1", &mut model).unwrap();
        d.route("bn_views UPDATE 1", &mut model).unwrap();
        assert_eq!(d.locks().len(), 2);
    }

    #[test]
    fn global_edge_waits_for_target_module_lock() {
        let d = dispatcher();
        let worker = d.clone();
        let (started_tx, started_rx) = mpsc::channel();
        let (done_tx, done_rx) = mpsc::channel();

        d.locks().with_lock(Some(ModuleId(2)), || {
            thread::spawn(move || {
                let mut model = MockModel::default()
                    .with_module(1)
                    .with_module(2)
                    .with_edge(10, (1, 2), 100, 200);
                started_tx.send(()).unwrap();
                let events = worker
                    .route("bn_global_edge_comments INSERT 1 2 100 200 55", &mut model)
                    .unwrap();
                done_tx.send(events.len()).unwrap();
            });
            started_rx.recv().unwrap();
            assert!(done_rx.recv_timeout(Duration::from_millis(100)).is_err());
        });

        assert_eq!(done_rx.recv().unwrap(), 1);
        assert!(d.locks().len() >= 2);
    }
}
