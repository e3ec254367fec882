//! Notifications flowing from a listen connection into a live model.

use std::collections::{BTreeSet, HashMap, HashSet, VecDeque};
use std::sync::Arc;
use std::time::Duration;

use navi_core::{
    Address, CommentId, EdgeId, ExpressionId, ModuleId, NodeId, ProjectId, TypeInstanceId,
    UserId, ViewId,
};
use navi_notify::{
    provider_task, Channel, CommentAction, CommentEvent, CommentInformer, DataLoader, Dispatcher,
    Event, FunctionData, FunctionEvent, FunctionInformer, LocalComment, LocalView, ModelResolver,
    NodeKind, Notification, NotificationProvider, NotificationSource, NotifyError, OperandTree,
    ProviderCommand, TypeEvent, TypeInformer, TypeInstanceEvent, TypeInstanceInformer,
    TypeSubstitution, ViewConfiguration, ViewEvent, ViewInformer, ViewOwner,
};
use tokio::sync::{mpsc, Mutex as TokioMutex};

const OWN_PID: i32 = 100;

/// A front end holding one module with a few comments and functions.
/// Function rows stand in for the database.
#[derive(Default)]
struct Workspace {
    modules: HashSet<ModuleId>,
    comments: HashMap<CommentId, LocalComment>,
    functions: HashMap<(ModuleId, Address), FunctionData>,
    function_rows: HashMap<(ModuleId, Address), FunctionData>,
}

fn function(name: &str) -> FunctionData {
    FunctionData {
        name: name.into(),
        description: String::new(),
        stack_frame: None,
        prototype: None,
        forwarded_to: None,
    }
}

impl Workspace {
    fn loaded() -> Self {
        let mut ws = Workspace::default();
        ws.modules.insert(ModuleId(1));
        ws.comments.insert(
            CommentId(5),
            LocalComment {
                id: CommentId(5),
                parent: None,
                user: UserId(1),
                text: "checks the license".into(),
            },
        );
        ws.functions
            .insert((ModuleId(1), Address(4096)), function("sub_1000"));
        ws.function_rows
            .insert((ModuleId(1), Address(4096)), function("validate_license"));
        ws
    }

    fn text_of(&self, id: u32) -> Option<&str> {
        self.comments.get(&CommentId(id)).map(|c| c.text.as_str())
    }

    fn name_at(&self, address: u64) -> &str {
        &self.functions[&(ModuleId(1), Address(address))].name
    }
}

impl ModelResolver for Workspace {
    fn is_module_loaded(&self, module: ModuleId) -> bool {
        self.modules.contains(&module)
    }

    fn is_project_loaded(&self, _project: ProjectId) -> bool {
        false
    }

    fn comment(&self, id: CommentId) -> Option<LocalComment> {
        self.comments.get(&id).cloned()
    }

    fn has_edge(&self, _edge: EdgeId) -> bool {
        false
    }

    fn edges_between(&self, _: ModuleId, _: Address, _: ModuleId, _: Address) -> Vec<EdgeId> {
        Vec::new()
    }

    fn node_kind(&self, _node: NodeId) -> Option<NodeKind> {
        None
    }

    fn code_nodes_at(&self, _module: ModuleId, _address: Address) -> Vec<NodeId> {
        Vec::new()
    }

    fn has_instruction(&self, _module: ModuleId, _address: Address) -> bool {
        false
    }

    fn has_function(&self, module: ModuleId, address: Address) -> bool {
        self.functions.contains_key(&(module, address))
    }

    fn has_type_instance(&self, _module: ModuleId, _instance: TypeInstanceId) -> bool {
        false
    }

    fn operand_tree(&self, _: ModuleId, _: Address, _: u32) -> Option<OperandTree> {
        None
    }

    fn view(&self, _view: ViewId) -> Option<LocalView> {
        None
    }
}

impl DataLoader for Workspace {
    fn load_function(&self, module: ModuleId, address: Address) -> Result<FunctionData, NotifyError> {
        self.function_rows
            .get(&(module, address))
            .cloned()
            .ok_or_else(|| NotifyError::load(format!("function {address}"), "row missing"))
    }

    fn load_view_configuration(
        &self,
        _owner: ViewOwner,
        _view: ViewId,
    ) -> Result<Option<ViewConfiguration>, NotifyError> {
        Ok(None)
    }

    fn load_type_substitution(
        &self,
        _: ModuleId,
        _: Address,
        _: u32,
        expression: ExpressionId,
    ) -> Result<TypeSubstitution, NotifyError> {
        Err(NotifyError::load(format!("substitution {expression}"), "not stored"))
    }
}

impl CommentInformer for Workspace {
    fn inform_comment(&mut self, event: &CommentEvent) -> Result<(), NotifyError> {
        if let CommentEvent::Comment {
            action, current, ..
        } = event
        {
            match action {
                CommentAction::Delete => {
                    self.comments.remove(&current.id);
                }
                _ => {
                    self.comments.insert(current.id, current.clone());
                }
            }
        }
        Ok(())
    }
}

impl FunctionInformer for Workspace {
    fn inform_function(&mut self, event: &FunctionEvent) -> Result<(), NotifyError> {
        self.functions
            .insert((event.module, event.address), event.data.clone());
        Ok(())
    }
}

impl TypeInstanceInformer for Workspace {
    fn inform_type_instance(&mut self, _event: &TypeInstanceEvent) -> Result<(), NotifyError> {
        Ok(())
    }
}

impl TypeInformer for Workspace {
    fn inform_type(&mut self, _event: &TypeEvent) -> Result<(), NotifyError> {
        Ok(())
    }
}

impl ViewInformer for Workspace {
    fn inform_view(&mut self, _event: &ViewEvent) -> Result<(), NotifyError> {
        Ok(())
    }
}

/// Listen connection replaying a fixed set of notifications once.
#[derive(Default)]
struct ReplaySource {
    pending: VecDeque<Notification>,
    listening: Vec<String>,
}

impl ReplaySource {
    fn with(notifications: &[(&str, i32, &str)]) -> Self {
        Self {
            pending: notifications
                .iter()
                .map(|(channel, pid, payload)| Notification {
                    channel: channel.to_string(),
                    pid: *pid,
                    payload: payload.to_string(),
                })
                .collect(),
            listening: Vec::new(),
        }
    }
}

impl NotificationSource for ReplaySource {
    fn backend_pid(&self) -> i32 {
        OWN_PID
    }

    fn listen(&mut self, channel: &str) -> Result<(), NotifyError> {
        self.listening.push(channel.to_string());
        Ok(())
    }

    fn unlisten(&mut self, channel: &str) -> Result<(), NotifyError> {
        self.listening.retain(|c| c != channel);
        Ok(())
    }

    fn poll(&mut self) -> Result<Vec<Notification>, NotifyError> {
        Ok(self.pending.drain(..).collect())
    }

    fn is_valid(&self) -> bool {
        true
    }

    fn reconnect(&mut self) -> Result<(), NotifyError> {
        Ok(())
    }
}

#[test]
fn comment_edit_updates_the_model() {
    let dispatcher = Dispatcher::new().unwrap();
    let mut ws = Workspace::loaded();

    let events = dispatcher
        .route("bn_comments UPDATE 5 null 1 checks the serial", &mut ws)
        .unwrap();

    assert_eq!(events.len(), 1);
    assert_eq!(ws.text_of(5), Some("checks the serial"));
}

#[test]
fn diverged_comment_leaves_the_model_alone() {
    let dispatcher = Dispatcher::new().unwrap();
    let mut ws = Workspace::loaded();

    let err = dispatcher
        .route("bn_comments UPDATE 5 4 1 checks the serial", &mut ws)
        .unwrap_err();

    assert!(matches!(err, NotifyError::ConsistencyViolation { .. }), "got: {err}");
    assert!(err.is_fatal());
    assert_eq!(ws.text_of(5), Some("checks the license"));
}

#[test]
fn comment_delete_removes_it() {
    let dispatcher = Dispatcher::new().unwrap();
    let mut ws = Workspace::loaded();

    dispatcher
        .route("bn_comments DELETE 5 null 1 checks the license", &mut ws)
        .unwrap();

    assert_eq!(ws.text_of(5), None);
}

#[test]
fn batch_keeps_going_after_a_load_failure() {
    let dispatcher = Dispatcher::new().unwrap();
    let mut ws = Workspace::loaded();
    ws.functions.insert((ModuleId(1), Address(8192)), function("sub_2000"));

    let report = dispatcher.dispatch_batch(
        Channel::Functions,
        ["bn_functions UPDATE 1 8192", "bn_functions UPDATE 1 4096"],
        &mut ws,
    );

    assert!(report.aborted.is_none());
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].0, "bn_functions UPDATE 1 8192");
    assert_eq!(report.events.len(), 1);
    assert_eq!(ws.name_at(4096), "validate_license");
    assert_eq!(ws.name_at(8192), "sub_2000");
}

#[test]
fn same_line_twice_is_harmless() {
    let dispatcher = Dispatcher::new().unwrap();
    let mut ws = Workspace::loaded();

    for _ in 0..2 {
        dispatcher.route("bn_functions UPDATE 1 4096", &mut ws).unwrap();
    }

    assert_eq!(ws.name_at(4096), "validate_license");
    assert_eq!(ws.functions.len(), 1);
}

#[tokio::test(start_paused = true)]
async fn provider_task_applies_foreign_notifications() {
    let source = ReplaySource::with(&[
        ("comment_changes", 7, "bn_comments UPDATE 5 null 1 checks the serial"),
        ("comment_changes", OWN_PID, "bn_comments UPDATE 5 null 1 our own edit"),
        ("function_changes", 7, "bn_functions UPDATE 1 4096"),
    ]);
    let provider = NotificationProvider::new(source, Dispatcher::new().unwrap());
    let model = Arc::new(TokioMutex::new(Workspace::loaded()));
    let (cmd_tx, cmd_rx) = mpsc::channel(4);
    let (evt_tx, mut evt_rx) = mpsc::unbounded_channel();

    cmd_tx
        .send(ProviderCommand::SetChannels(BTreeSet::from([
            Channel::Comments,
            Channel::Functions,
        ])))
        .await
        .unwrap();
    let handle = tokio::spawn(provider_task(
        provider,
        Arc::clone(&model),
        Duration::from_millis(250),
        cmd_rx,
        evt_tx,
    ));

    // Functions are dispatched before comments within one poll.
    let first = evt_rx.recv().await.unwrap();
    assert!(matches!(first, Event::Function(_)), "got: {first:?}");
    let second = evt_rx.recv().await.unwrap();
    assert!(matches!(second, Event::Comment(_)), "got: {second:?}");

    tokio::time::sleep(Duration::from_millis(600)).await;
    cmd_tx.send(ProviderCommand::Shutdown).await.unwrap();
    let provider = handle.await.unwrap();

    assert_eq!(
        provider.listened(),
        &BTreeSet::from([Channel::Functions, Channel::Comments])
    );
    let mut listening = provider.into_source().listening;
    listening.sort();
    assert_eq!(listening, vec!["comment_changes", "function_changes"]);

    let ws = model.lock().await;
    assert_eq!(ws.text_of(5), Some("checks the serial"));
    assert_eq!(ws.name_at(4096), "validate_license");
    assert!(evt_rx.try_recv().is_err());
}
