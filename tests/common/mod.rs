//! In-process fixtures: fake collaborators and simulated gateway processes
//! sharing one store and one bus.

#![allow(dead_code, clippy::panic)]

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{Value, json};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use parley_gateway::app_state::AppState;
use parley_gateway::bus::{MemoryBus, MessageBus};
use parley_gateway::config::GatewayConfig;
use parley_gateway::domain::{ActorType, ConnectionHandle, Identity, Namespace};
use parley_gateway::error::GatewayError;
use parley_gateway::gateway::NamespaceGateway;
use parley_gateway::persistence::models::{ConversationRecord, MessageRecord};
use parley_gateway::persistence::{MemoryStore, SharedStore};
use parley_gateway::service::{DomainStore, TokenVerifier};
use parley_gateway::ws::hub::{ConnectionHub, Outbound};
use parley_gateway::ws::messages::{ClientAction, ConnectAuth};

/// Organization every fixture belongs to.
pub const ORG: i64 = 7;
/// Known agent user ids.
pub const AGENT_1: i64 = 1;
/// Second agent in the same organization.
pub const AGENT_2: i64 = 2;
/// Known customer id.
pub const CUSTOMER: i64 = 9;
/// Conversation owned by [`CUSTOMER`].
pub const CONVERSATION: i64 = 42;
/// Message in [`CONVERSATION`].
pub const MESSAGE: i64 = 100;

/// Business database stand-in with a fixed data set.
#[derive(Debug, Default)]
pub struct FakeDomain {
    online: Mutex<HashMap<(ActorType, i64), bool>>,
    seen: Mutex<Vec<i64>>,
    presence_down: AtomicBool,
}

impl FakeDomain {
    /// Makes every presence write fail until switched back.
    pub fn fail_presence(&self, failing: bool) {
        self.presence_down.store(failing, Ordering::SeqCst);
    }

    /// Last online flag written for an actor.
    pub fn is_online(&self, actor: ActorType, id: i64) -> Option<bool> {
        self.online
            .lock()
            .ok()
            .and_then(|m| m.get(&(actor, id)).copied())
    }

    /// Messages marked seen so far.
    pub fn seen(&self) -> Vec<i64> {
        self.seen.lock().map(|s| s.clone()).unwrap_or_default()
    }

    fn known(actor: ActorType, id: i64) -> bool {
        match actor {
            ActorType::Agent => id == AGENT_1 || id == AGENT_2,
            ActorType::Customer => id == CUSTOMER,
        }
    }

    fn message() -> MessageRecord {
        MessageRecord {
            id: MESSAGE,
            conversation_id: CONVERSATION,
            snapshot: json!({"id": MESSAGE, "conversation_id": CONVERSATION, "body": "hello"}),
        }
    }
}

#[async_trait]
impl DomainStore for FakeDomain {
    async fn mark_actor_online(
        &self,
        actor: ActorType,
        id: i64,
        online: bool,
    ) -> Result<Option<Value>, GatewayError> {
        if self.presence_down.load(Ordering::SeqCst) {
            return Err(GatewayError::Domain("presence update failed".to_string()));
        }
        if !Self::known(actor, id) {
            return Ok(None);
        }
        if let Ok(mut map) = self.online.lock() {
            map.insert((actor, id), online);
        }
        Ok(Some(json!({"id": id, "kind": actor.as_str(), "is_online": online})))
    }

    async fn resolve_message(&self, id: i64) -> Result<Option<MessageRecord>, GatewayError> {
        Ok((id == MESSAGE).then(Self::message))
    }

    async fn mark_message_seen(&self, id: i64) -> Result<Option<MessageRecord>, GatewayError> {
        if id != MESSAGE {
            return Ok(None);
        }
        if let Ok(mut seen) = self.seen.lock() {
            seen.push(id);
        }
        Ok(Some(Self::message()))
    }

    async fn resolve_conversation(
        &self,
        id: i64,
    ) -> Result<Option<ConversationRecord>, GatewayError> {
        Ok((id == CONVERSATION).then(|| ConversationRecord {
            id,
            organization_id: ORG,
            customer_id: Some(CUSTOMER),
            snapshot: json!({"id": id, "organization_id": ORG, "customer_id": CUSTOMER}),
        }))
    }

    async fn resolve_customer(&self, id: i64) -> Result<Option<Value>, GatewayError> {
        Ok((id == CUSTOMER).then(|| json!({"id": id, "name": "Visitor"})))
    }

    async fn resolve_user(&self, id: i64) -> Result<Option<Value>, GatewayError> {
        Ok(Self::known(ActorType::Agent, id).then(|| json!({"id": id, "email": "agent@example.com"})))
    }
}

/// Accepts `agent-{id}` tokens for the known agents; `no-org` verifies
/// without an organization.
#[derive(Debug, Default)]
pub struct FakeVerifier;

#[async_trait]
impl TokenVerifier for FakeVerifier {
    async fn verify(&self, token: &str) -> Option<Identity> {
        if token == "no-org" {
            return Some(Identity {
                user_id: 77,
                organization_id: None,
                email: None,
            });
        }
        let user_id: i64 = token.strip_prefix("agent-")?.parse().ok()?;
        FakeDomain::known(ActorType::Agent, user_id).then(|| Identity {
            user_id,
            organization_id: Some(ORG),
            email: Some(format!("agent{user_id}@example.com")),
        })
    }
}

/// Session store wrapper whose writes or deletes fail on demand.
#[derive(Debug)]
pub struct FaultyStore {
    inner: Arc<MemoryStore>,
    writes_down: AtomicBool,
    deletes_down: AtomicBool,
}

impl FaultyStore {
    /// Wraps `inner` with every operation healthy.
    pub fn new(inner: Arc<MemoryStore>) -> Self {
        Self {
            inner,
            writes_down: AtomicBool::new(false),
            deletes_down: AtomicBool::new(false),
        }
    }

    /// Makes `set` and `set_add` fail until switched back.
    pub fn fail_writes(&self, failing: bool) {
        self.writes_down.store(failing, Ordering::SeqCst);
    }

    /// Makes `delete` and `delete_if_equals` fail until switched back.
    pub fn fail_deletes(&self, failing: bool) {
        self.deletes_down.store(failing, Ordering::SeqCst);
    }

    fn check(flag: &AtomicBool) -> Result<(), GatewayError> {
        if flag.load(Ordering::SeqCst) {
            return Err(GatewayError::RegistryUnavailable(
                "store unreachable".to_string(),
            ));
        }
        Ok(())
    }
}

#[async_trait]
impl SharedStore for FaultyStore {
    async fn get(&self, key: &str) -> Result<Option<String>, GatewayError> {
        self.inner.get(key).await
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), GatewayError> {
        Self::check(&self.writes_down)?;
        self.inner.set(key, value).await
    }

    async fn delete(&self, key: &str) -> Result<(), GatewayError> {
        Self::check(&self.deletes_down)?;
        self.inner.delete(key).await
    }

    async fn delete_if_equals(&self, key: &str, expected: &str) -> Result<bool, GatewayError> {
        Self::check(&self.deletes_down)?;
        self.inner.delete_if_equals(key, expected).await
    }

    async fn set_add(&self, key: &str, member: &str) -> Result<(), GatewayError> {
        Self::check(&self.writes_down)?;
        self.inner.set_add(key, member).await
    }

    async fn set_remove(&self, key: &str, member: &str) -> Result<(), GatewayError> {
        self.inner.set_remove(key, member).await
    }

    async fn set_members(&self, key: &str) -> Result<HashSet<String>, GatewayError> {
        self.inner.set_members(key).await
    }

    async fn ping(&self) -> Result<(), GatewayError> {
        self.inner.ping().await
    }
}

/// Backends shared by every simulated process.
#[derive(Debug, Clone)]
pub struct Cluster {
    /// Shared session store.
    pub store: Arc<MemoryStore>,
    /// The same store as seen by the processes, with fault switches.
    pub faults: Arc<FaultyStore>,
    /// Shared bus.
    pub bus: Arc<MemoryBus>,
    /// Shared business database.
    pub domain: Arc<FakeDomain>,
}

impl Cluster {
    /// Fresh backends.
    pub fn new() -> Self {
        let store = Arc::new(MemoryStore::new());
        Self {
            faults: Arc::new(FaultyStore::new(Arc::clone(&store))),
            store,
            bus: Arc::new(MemoryBus::new(1024)),
            domain: Arc::new(FakeDomain::default()),
        }
    }

    /// Starts one gateway process over the shared backends.
    pub async fn process(&self) -> Process {
        let store: Arc<dyn SharedStore> = Arc::<FaultyStore>::clone(&self.faults);
        let bus: Arc<dyn MessageBus> = Arc::<MemoryBus>::clone(&self.bus);
        let domain: Arc<dyn DomainStore> = Arc::<FakeDomain>::clone(&self.domain);
        let state = AppState::new(
            GatewayConfig::default(),
            store,
            bus,
            domain,
            Arc::new(FakeVerifier),
        );
        let Ok(dispatch) = state.start_dispatch().await else {
            panic!("bus subscription failed");
        };
        Process { state, dispatch }
    }
}

/// One simulated gateway process.
#[derive(Debug)]
pub struct Process {
    /// Wired application state.
    pub state: AppState,
    dispatch: JoinHandle<()>,
}

impl Drop for Process {
    fn drop(&mut self) {
        self.dispatch.abort();
    }
}

impl Process {
    /// Opens a simulated connection and runs the connect hook.
    pub async fn connect(
        &self,
        namespace: Namespace,
        auth: ConnectAuth,
    ) -> Result<Client, GatewayError> {
        let gateway = self.state.gateways.for_namespace(namespace);
        let hub = Arc::clone(&self.state.hub);
        let handle = ConnectionHandle::new();
        let (tx, rx) = mpsc::channel(64);
        hub.register(handle.clone(), namespace, tx).await;
        match gateway.on_connect(&handle, &auth).await {
            Ok(_) => Ok(Client {
                handle,
                rx,
                gateway,
                hub,
            }),
            Err(e) => {
                hub.unregister(&handle).await;
                Err(e)
            }
        }
    }

    /// Connects agent `user_id` via token.
    pub async fn agent(&self, user_id: i64) -> Client {
        let auth = ConnectAuth {
            token: Some(format!("agent-{user_id}")),
            ..ConnectAuth::default()
        };
        let Ok(client) = self.connect(Namespace::Agent, auth).await else {
            panic!("agent {user_id} rejected");
        };
        client
    }

    /// Connects [`CUSTOMER`], optionally straight into a conversation.
    pub async fn customer(&self, conversation_id: Option<i64>) -> Client {
        let auth = ConnectAuth {
            customer_id: Some(CUSTOMER),
            organization_id: Some(ORG),
            conversation_id,
            ..ConnectAuth::default()
        };
        let Ok(client) = self.connect(Namespace::Customer, auth).await else {
            panic!("customer rejected");
        };
        client
    }
}

/// A simulated connection: its handle and outbound queue.
#[derive(Debug)]
pub struct Client {
    /// Connection handle.
    pub handle: ConnectionHandle,
    rx: mpsc::Receiver<Outbound>,
    gateway: Arc<dyn NamespaceGateway>,
    hub: Arc<ConnectionHub>,
}

impl Client {
    /// Sends a client action.
    pub async fn act(&self, action: ClientAction) -> Result<(), GatewayError> {
        self.gateway.on_action(&self.handle, action).await
    }

    /// Closes the connection the way the transport does.
    pub async fn disconnect(self) {
        self.hub.unregister(&self.handle).await;
        self.gateway.on_disconnect(&self.handle).await;
    }

    /// Waits for the next delivered event; `None` after `timeout_ms` of
    /// silence.
    pub async fn next_event(&mut self, timeout_ms: u64) -> Option<(String, Value)> {
        loop {
            let item = tokio::time::timeout(Duration::from_millis(timeout_ms), self.rx.recv())
                .await
                .ok()??;
            if let Outbound::Frame(frame) = item {
                let name = frame.payload.get("event")?.as_str()?.to_string();
                let data = frame.payload.get("data").cloned().unwrap_or(Value::Null);
                return Some((name, data));
            }
        }
    }

    /// Waits until an event called `name` arrives, skipping others.
    pub async fn expect(&mut self, name: &str) -> Value {
        while let Some((event, data)) = self.next_event(1_000).await {
            if event == name {
                return data;
            }
        }
        panic!("{name} never arrived at {}", self.handle);
    }

    /// Waits until every event in `names` has arrived, in any order.
    pub async fn expect_all(&mut self, names: &[&str]) {
        let mut missing: Vec<&str> = names.to_vec();
        while !missing.is_empty() {
            let Some((event, _)) = self.next_event(1_000).await else {
                panic!("{missing:?} never arrived at {}", self.handle);
            };
            missing.retain(|name| *name != event);
        }
    }

    /// Every event name delivered within `window_ms`.
    pub async fn drain(&mut self, window_ms: u64) -> Vec<String> {
        tokio::time::sleep(Duration::from_millis(window_ms)).await;
        let mut names = Vec::new();
        while let Ok(item) = self.rx.try_recv() {
            if let Outbound::Frame(frame) = item
                && let Some(name) = frame.payload.get("event").and_then(Value::as_str)
            {
                names.push(name.to_string());
            }
        }
        names
    }
}
