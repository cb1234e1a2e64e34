//! The USSD session state machine.
//!
//! One call to [`UssdEngine::handle`] processes one gateway keystroke:
//!
//! 1. Serialize on the session id and take a snapshot of the current menu.
//! 2. Load the stored session. Absent, ended, or `newRequest` means a new
//!    session positioned on the home step (known caller) or the onboarding
//!    step (unknown caller). The initial step is rendered without matching input.
//! 3. A pending continuation plus the continuation trigger returns the next
//!    page without consulting the catalog.
//! 4. Otherwise the input is matched against the current step's rules. A match
//!    runs the rule's validation (outcome logged only) and action, then moves
//!    to the next step and renders it. The transition is committed only after
//!    the action succeeded.
//! 5. The reply is paginated and the session persisted with a refreshed TTL.
//!
//! Every failure becomes a generic localized reply that ends the session; the
//! stored record is marked ended when the store is still reachable.

pub mod locks;

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, error, info, warn};
use ussd_types::config::UssdConfig;
use ussd_types::error::{ActionError, CatalogError, UssdError};
use ussd_types::session::{PendingPage, Session, SessionStatus};
use ussd_types::step::{Step, StepContent};
use ussd_types::ussd::{UssdReply, UssdRequest};

use crate::action::registry::ActionRegistry;
use crate::action::{ActionContext, CustomerSnapshot};
use crate::localize::keys;
use crate::matcher::{has_exact_trigger, match_input};
use crate::menu::{MenuDefinition, SharedMenu};
use crate::paginate::Paginator;
use crate::repository::customer::CustomerRepository;
use crate::storage::cache::CacheStore;
use crate::storage::session_store::{EXTRA_ITEM, SessionStore};

use self::locks::SessionLocks;

/// Engine tunables, usually derived from [`UssdConfig`].
#[derive(Debug, Clone)]
pub struct EngineSettings {
    pub home_step: String,
    pub onboarding_step: String,
    pub default_language: String,
    pub continuation_trigger: String,
    pub back_trigger: String,
    pub max_message_length: usize,
    pub max_history: usize,
    pub session_ttl: Duration,
    pub store_timeout: Duration,
}

impl EngineSettings {
    pub fn from_config(config: &UssdConfig) -> Self {
        Self {
            home_step: config.menu.home_step.clone(),
            onboarding_step: config.menu.onboarding_step.clone(),
            default_language: config.menu.default_language.clone(),
            continuation_trigger: config.menu.continuation_trigger.clone(),
            back_trigger: config.menu.back_trigger.clone(),
            max_message_length: config.menu.max_message_length,
            max_history: config.session.max_history,
            session_ttl: Duration::from_secs(config.session.ttl_secs),
            store_timeout: Duration::from_millis(config.session.store_timeout_ms),
        }
    }

    /// Steps every menu must define.
    pub fn entry_steps(&self) -> [&str; 2] {
        [self.home_step.as_str(), self.onboarding_step.as_str()]
    }
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self::from_config(&UssdConfig::default())
    }
}

/// The USSD engine.
///
/// Generic over the cache backing the session store and the customer
/// repository; the API layer picks concrete types.
pub struct UssdEngine<C: CacheStore, R: CustomerRepository> {
    store: SessionStore<C>,
    customers: R,
    registry: ActionRegistry,
    menu: SharedMenu,
    paginator: Paginator,
    settings: EngineSettings,
    locks: SessionLocks,
}

impl<C: CacheStore, R: CustomerRepository> UssdEngine<C, R> {
    /// Build an engine. Fails if the menu lacks an entry step or references
    /// an unregistered action or validation.
    pub fn new(
        cache: C,
        customers: R,
        registry: ActionRegistry,
        menu: MenuDefinition,
        settings: EngineSettings,
    ) -> Result<Self, CatalogError> {
        menu.verify(&registry, &settings.entry_steps())?;
        Ok(Self {
            store: SessionStore::new(cache, settings.session_ttl, settings.store_timeout),
            customers,
            registry,
            menu: SharedMenu::new(menu),
            paginator: Paginator::new(settings.max_message_length),
            settings,
            locks: SessionLocks::new(),
        })
    }

    /// Verify and swap in a new menu. On error the current menu stays.
    pub fn reload_menu(&self, menu: MenuDefinition) -> Result<(), CatalogError> {
        menu.verify(&self.registry, &self.settings.entry_steps())?;
        info!(steps = menu.catalog.len(), "menu reloaded");
        self.menu.replace(menu);
        Ok(())
    }

    pub fn menu(&self) -> Arc<MenuDefinition> {
        self.menu.snapshot()
    }

    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    pub fn store(&self) -> &SessionStore<C> {
        &self.store
    }

    pub fn registry(&self) -> &ActionRegistry {
        &self.registry
    }

    /// Process one gateway request. Never fails: errors become a generic
    /// reply that ends the session.
    #[tracing::instrument(
        name = "ussd.handle",
        skip_all,
        fields(session_id = %request.session_id, new_request = request.new_request)
    )]
    pub async fn handle(&self, request: &UssdRequest) -> UssdReply {
        let _guard = self.locks.acquire(&request.session_id).await;
        let menu = self.menu.snapshot();

        match self.process(request, &menu).await {
            Ok(reply) => {
                debug!(ended = reply.is_ended(), "reply ready");
                reply
            }
            Err(e) => {
                let reply = self.failure_reply(&e, &menu);
                if !matches!(e, UssdError::Store(_) | UssdError::Validation(_)) {
                    self.close_after_failure(&request.session_id, &reply.message)
                        .await;
                }
                reply
            }
        }
    }

    async fn process(
        &self,
        request: &UssdRequest,
        menu: &MenuDefinition,
    ) -> Result<UssdReply, UssdError> {
        request.validate()?;

        let stored = if request.new_request {
            None
        } else {
            self.store.get(&request.session_id).await?
        };

        let mut session = match stored {
            Some(session) if session.is_active() => session,
            Some(_) => {
                debug!("previous session ended; starting over");
                return self.start_session(request, menu).await;
            }
            None => return self.start_session(request, menu).await,
        };

        if request.input.trim() == self.settings.continuation_trigger {
            if let Some(pending) = session.take_continuation() {
                debug!("resuming paginated reply");
                return self
                    .respond(&mut session, menu, pending.text, pending.ends_session)
                    .await;
            }
        }

        self.advance(&mut session, request, menu).await
    }

    /// Create, render, and persist a new session.
    async fn start_session(
        &self,
        request: &UssdRequest,
        menu: &MenuDefinition,
    ) -> Result<UssdReply, UssdError> {
        let customer = self.customers.find_by_phone(&request.msisdn).await?;

        let mut session = match &customer {
            Some(customer) => Session::new(
                &request.session_id,
                &request.msisdn,
                &request.network_code,
                &self.settings.default_language,
                &self.settings.home_step,
            )
            .with_customer(customer),
            None => Session::new(
                &request.session_id,
                &request.msisdn,
                &request.network_code,
                &self.settings.default_language,
                &self.settings.onboarding_step,
            ),
        };
        info!(
            known_customer = customer.is_some(),
            step = %session.current_step_id,
            language = %session.language,
            "new session"
        );

        let step = menu.catalog.resolve(&session.current_step_id)?;
        let mut ctx = self.context(&session, request);
        let text = self.render(step, &mut ctx, menu).await?;
        self.respond(&mut session, menu, text, step.is_end_session)
            .await
    }

    /// Match input on the current step and move the session accordingly.
    async fn advance(
        &self,
        session: &mut Session,
        request: &UssdRequest,
        menu: &MenuDefinition,
    ) -> Result<UssdReply, UssdError> {
        let input = request.input.trim();
        let current = menu.catalog.resolve(&session.current_step_id)?;

        if current.allow_back
            && input == self.settings.back_trigger
            && !has_exact_trigger(&current.inputs, input)
            && session.go_back().is_some()
        {
            debug!(from = %current.id, to = %session.current_step_id, "back navigation");
            let previous = menu.catalog.resolve(&session.current_step_id)?;
            session.last_input = Some(input.to_string());
            let mut ctx = self.context(session, request);
            let text = self.render(previous, &mut ctx, menu).await?;
            return self
                .respond(session, menu, text, previous.is_end_session)
                .await;
        }

        let Some(rule) = match_input(&current.inputs, input) else {
            debug!(step = %current.id, input = %input, "no matching input");
            session.last_input = Some(input.to_string());
            let text = menu.localizer.resolve(keys::INVALID_INPUT, &session.language);
            return self.respond(session, menu, text, false).await;
        };

        let mut ctx = self.context(session, request);
        ctx.value = rule.value.clone();

        let validation = rule
            .validation_name
            .as_deref()
            .or(current.validation_name.as_deref());
        if let Some(name) = validation {
            let passed = self.registry.validate(name, input, &ctx)?;
            debug!(validation = %name, passed, "validation ran; outcome not enforced");
        }

        let result = match rule.action_name.as_deref() {
            Some(name) => self.run_action(name, &mut ctx).await?,
            None => String::new(),
        };
        session.last_input = Some(input.to_string());

        if current.is_end_session {
            let text = if result.trim().is_empty() {
                menu.localizer
                    .resolve(keys::END_SESSION_DEFAULT, &session.language)
            } else {
                result
            };
            return self.respond(session, menu, text, true).await;
        }

        let Some(next_id) = rule.next_step_id.as_deref() else {
            return Err(UssdError::Configuration(format!(
                "step '{}' input '{}' has no next step",
                current.id, rule.trigger
            )));
        };
        if !result.is_empty() {
            debug!(action_output_len = result.len(), "action output replaced by next step content");
        }

        let next = menu.catalog.resolve(next_id)?;
        ctx.value.clear();
        let text = self.render(next, &mut ctx, menu).await?;
        session.advance_to(&next.id, self.settings.max_history);
        self.respond(session, menu, text, next.is_end_session).await
    }

    /// Produce the display text of a step.
    async fn render(
        &self,
        step: &Step,
        ctx: &mut ActionContext,
        menu: &MenuDefinition,
    ) -> Result<String, UssdError> {
        match &step.content {
            StepContent::Action(name) => self.run_action(name, ctx).await,
            StepContent::Template(key) => Ok(menu.localizer.resolve(key, &ctx.language)),
        }
    }

    /// Invoke an action with the session's extra data loaded, persisting the
    /// extra data if the action changed it.
    async fn run_action(&self, name: &str, ctx: &mut ActionContext) -> Result<String, UssdError> {
        let extra = self.store.get_item(&ctx.session_id, EXTRA_ITEM).await?;
        ctx.load_extra(extra);

        let text = self.registry.invoke(name, ctx).await?;

        if let Some(changed) = ctx.take_changed_extra() {
            self.store
                .set_item(&ctx.session_id, EXTRA_ITEM, changed)
                .await?;
        }
        Ok(text)
    }

    /// Paginate `text`, update the session and persist it.
    async fn respond(
        &self,
        session: &mut Session,
        menu: &MenuDefinition,
        text: String,
        ends_session: bool,
    ) -> Result<UssdReply, UssdError> {
        let suffix = menu.localizer.resolve(keys::MORE_SUFFIX, &session.language);
        let page = self.paginator.paginate(&text, &suffix);

        // A paginated final reply stays open until its last page.
        let ended = match page.remainder {
            Some(remainder) => {
                session.pending_continuation = Some(PendingPage {
                    language: session.language.clone(),
                    text: remainder,
                    ends_session,
                });
                false
            }
            None => {
                session.pending_continuation = None;
                ends_session
            }
        };

        session.last_response = Some(page.visible.clone());
        session.status = if ended {
            SessionStatus::Ended
        } else {
            SessionStatus::Active
        };
        session.touch();
        self.store.set(session).await?;

        Ok(UssdReply::new(page.visible, ended))
    }

    /// Mark the stored session ended so the next request starts over.
    /// Best effort: a session that cannot be closed is left to its TTL.
    async fn close_after_failure(&self, session_id: &str, message: &str) {
        let mut session = match self.store.get(session_id).await {
            Ok(Some(session)) if session.is_active() => session,
            Ok(_) => return,
            Err(e) => {
                warn!(error = %e, "could not close session after failure");
                return;
            }
        };

        session.status = SessionStatus::Ended;
        session.pending_continuation = None;
        session.last_response = Some(message.to_string());
        session.touch();
        if let Err(e) = self.store.set(&session).await {
            warn!(error = %e, "could not close session after failure");
        }
    }

    fn context(&self, session: &Session, request: &UssdRequest) -> ActionContext {
        let mut ctx = ActionContext::new(&session.session_id, &session.language);
        ctx.input = request.input.trim().to_string();
        ctx.phone = session.msisdn.clone();
        ctx.previous_input = session.last_input.clone();
        ctx.network_operator = session.network_operator.clone();
        ctx.customer = session
            .customer_id
            .as_ref()
            .map(|id| CustomerSnapshot {
                id: id.clone(),
                display_name: session.customer_name.clone().unwrap_or_default(),
            });
        ctx
    }

    fn failure_reply(&self, err: &UssdError, menu: &MenuDefinition) -> UssdReply {
        if let UssdError::Action(ActionError::Rejected(message)) = err {
            info!(reason = %message, "action ended the session");
            return UssdReply::new(message.clone(), true);
        }

        if err.is_critical() {
            error!(severity = "critical", error = %err, "menu configuration error");
        } else if matches!(err, UssdError::Validation(_)) {
            warn!(error = %err, "rejected request");
        } else {
            error!(error = %err, "request failed");
        }

        let text = menu
            .localizer
            .resolve(keys::SYSTEM_ERROR, &self.settings.default_language);
        UssdReply::new(text, true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    use serde_json::{Value, json};
    use ussd_types::customer::{Customer, NewCustomer};
    use ussd_types::error::{RepositoryError, StoreError};
    use ussd_types::ussd::ContinuationFlag;

    use crate::action::Action;
    use crate::catalog::StepCatalog;
    use crate::localize::Localizer;
    use crate::storage::memory::MemoryCacheStore;

    const CATALOG: &str = r#"
[steps.home]
content = "menu.home"

[[steps.home.inputs]]
input = "1"
next_step = "balance"

[[steps.home.inputs]]
input = "2"
value = "choice"
action = "store_input"
next_step = "goodbye"

[[steps.home.inputs]]
input = "3"
next_step = "entries"

[[steps.home.inputs]]
input = "4"
next_step = "terms"

[[steps.home.inputs]]
input = "5"
action = "refuse"
next_step = "goodbye"

[[steps.home.inputs]]
input = "6"
next_step = "policy"

[steps.onboarding]
content = "Welcome! Reply 1 to finish."

[[steps.onboarding.inputs]]
input = "1"
next_step = "goodbye"

[steps.balance]
content = "Your balance is 100."
allow_back = true

[[steps.balance.inputs]]
input = "9"
next_step = "home"

[steps.entries]
content = "action::list_entries"

[[steps.entries.inputs]]
input = ""
next_step = "home"

[steps.goodbye]
content = "Goodbye."
is_end_session = true

[steps.terms]
content = "terms.text"
is_end_session = true

[steps.policy]
content = "policy.text"
is_end_session = true
"#;

    fn long_terms() -> String {
        format!("{}\n{}", "a".repeat(140), "b".repeat(59))
    }

    fn long_policy() -> String {
        format!("{}\n{}\n{}", "a".repeat(100), "b".repeat(100), "c".repeat(100))
    }

    fn localizer() -> Localizer {
        let mut en = HashMap::new();
        en.insert("menu.home".to_string(), "1. Balance\n2. Finish\n3. Entries\n4. Terms".to_string());
        en.insert("terms.text".to_string(), long_terms());
        en.insert("policy.text".to_string(), long_policy());
        let mut rw = HashMap::new();
        rw.insert("menu.home".to_string(), "1. Amafaranga".to_string());

        let mut languages = HashMap::new();
        languages.insert("en".to_string(), en);
        languages.insert("rw".to_string(), rw);
        Localizer::new(languages, "en")
    }

    fn menu() -> MenuDefinition {
        MenuDefinition::new(StepCatalog::from_toml(CATALOG).unwrap(), localizer())
    }

    /// Ends the session with its own message.
    struct Refuse;

    impl Action for Refuse {
        fn name(&self) -> &str {
            "refuse"
        }

        async fn run(&self, _ctx: &mut ActionContext) -> Result<String, ActionError> {
            Err(ActionError::Rejected("Not eligible.".to_string()))
        }
    }

    fn registry() -> ActionRegistry {
        let mut registry = ActionRegistry::with_builtins();
        registry.register_action(Refuse);
        registry
    }

    #[derive(Default)]
    struct MockCustomers {
        known: HashMap<String, Customer>,
        fail: bool,
    }

    impl MockCustomers {
        fn with(phone: &str, locale: Option<&str>) -> Self {
            let mut known = HashMap::new();
            known.insert(
                phone.to_string(),
                Customer {
                    id: "c-1".to_string(),
                    display_name: "Alice".to_string(),
                    network_operator: "MTN".to_string(),
                    locale: locale.map(str::to_string),
                },
            );
            Self { known, fail: false }
        }
    }

    impl CustomerRepository for MockCustomers {
        async fn find_by_phone(&self, phone: &str) -> Result<Option<Customer>, RepositoryError> {
            if self.fail {
                return Err(RepositoryError::Connection);
            }
            Ok(self.known.get(phone).cloned())
        }

        async fn create(&self, _customer: &NewCustomer) -> Result<Customer, RepositoryError> {
            Err(RepositoryError::Query("read-only mock".to_string()))
        }
    }

    /// Every call fails as if the cache were unreachable.
    struct DownCache;

    impl CacheStore for DownCache {
        async fn get(&self, _key: &str) -> Result<Option<Value>, StoreError> {
            Err(StoreError::Unavailable("connection refused".to_string()))
        }

        async fn set(&self, _key: &str, _value: &Value, _ttl: Duration) -> Result<(), StoreError> {
            Err(StoreError::Unavailable("connection refused".to_string()))
        }
    }

    type TestEngine = UssdEngine<MemoryCacheStore, MockCustomers>;

    fn engine(customers: MockCustomers) -> (TestEngine, MemoryCacheStore) {
        let cache = MemoryCacheStore::new();
        let engine = UssdEngine::new(
            cache.clone(),
            customers,
            registry(),
            menu(),
            EngineSettings::default(),
        )
        .unwrap();
        (engine, cache)
    }

    fn request(input: &str, new_request: bool) -> UssdRequest {
        UssdRequest {
            msisdn: "250700000000".to_string(),
            input: input.to_string(),
            session_id: "S1".to_string(),
            network_code: "MTN".to_string(),
            new_request,
        }
    }

    async fn stored(engine: &TestEngine) -> Session {
        engine.store().get("S1").await.unwrap().unwrap()
    }

    fn system_error() -> String {
        Localizer::empty("en").resolve(keys::SYSTEM_ERROR, "en")
    }

    #[tokio::test]
    async fn test_unknown_caller_starts_on_onboarding() {
        let (engine, _) = engine(MockCustomers::default());
        let reply = engine.handle(&request("", true)).await;

        assert_eq!(reply.message, "Welcome! Reply 1 to finish.");
        assert_eq!(reply.continuation, ContinuationFlag::Continue);
        let session = stored(&engine).await;
        assert_eq!(session.current_step_id, "onboarding");
        assert!(session.customer_id.is_none());
    }

    #[tokio::test]
    async fn test_known_caller_starts_on_home_in_their_language() {
        let (engine, _) = engine(MockCustomers::with("250700000000", Some("rw")));
        let reply = engine.handle(&request("", true)).await;

        assert_eq!(reply.message, "1. Amafaranga");
        assert_eq!(reply.continuation, ContinuationFlag::Continue);
        let session = stored(&engine).await;
        assert_eq!(session.current_step_id, "home");
        assert_eq!(session.language, "rw");
        assert_eq!(session.customer_name.as_deref(), Some("Alice"));
    }

    #[tokio::test]
    async fn test_session_ends_then_restarts() {
        let (engine, _) = engine(MockCustomers::default());

        let first = engine.handle(&request("", true)).await;
        assert_eq!(first.continuation, ContinuationFlag::Continue);

        let second = engine.handle(&request("1", false)).await;
        assert_eq!(second.message, "Goodbye.");
        assert_eq!(second.continuation, ContinuationFlag::End);
        assert_eq!(stored(&engine).await.status, SessionStatus::Ended);

        let third = engine.handle(&request("1", false)).await;
        assert_eq!(third.message, "Welcome! Reply 1 to finish.");
        assert_eq!(third.continuation, ContinuationFlag::Continue);
        let session = stored(&engine).await;
        assert!(session.is_active());
        assert_eq!(session.current_step_id, "onboarding");
    }

    #[tokio::test]
    async fn test_invalid_input_keeps_step() {
        let (engine, _) = engine(MockCustomers::with("250700000000", None));
        engine.handle(&request("", true)).await;

        let reply = engine.handle(&request("7", false)).await;
        assert_eq!(reply.message, "Invalid input. Please try again.");
        assert_eq!(reply.continuation, ContinuationFlag::Continue);

        let session = stored(&engine).await;
        assert_eq!(session.current_step_id, "home");
        assert_eq!(session.last_input.as_deref(), Some("7"));
    }

    #[tokio::test]
    async fn test_long_reply_is_paginated_and_resumed_without_catalog() {
        let (engine, _) = engine(MockCustomers::with("250700000000", None));
        engine.handle(&request("", true)).await;

        let first = engine.handle(&request("4", false)).await;
        assert_eq!(first.message, format!("{}\nn. More", "a".repeat(140)));
        assert_eq!(first.continuation, ContinuationFlag::Continue);
        assert!(first.message.chars().count() <= 160);
        assert!(stored(&engine).await.has_continuation());

        // The continuation must not depend on the catalog.
        let bare = StepCatalog::from_toml("[steps.home]\ncontent = \"x\"\n").unwrap();
        engine
            .menu
            .replace(MenuDefinition::new(bare, localizer()));

        let second = engine.handle(&request("n", false)).await;
        assert_eq!(second.message, "b".repeat(59));
        assert_eq!(second.continuation, ContinuationFlag::End);
        assert!(!stored(&engine).await.has_continuation());
    }

    #[tokio::test]
    async fn test_continuation_trigger_without_pending_text_is_normal_input() {
        let (engine, _) = engine(MockCustomers::with("250700000000", None));
        engine.handle(&request("", true)).await;

        let reply = engine.handle(&request("n", false)).await;
        assert_eq!(reply.message, "Invalid input. Please try again.");
        assert_eq!(reply.continuation, ContinuationFlag::Continue);
    }

    #[tokio::test]
    async fn test_replay_without_advance_is_idempotent() {
        let (engine, _) = engine(MockCustomers::with("250700000000", None));
        let a = engine.handle(&request("", true)).await;
        let b = engine.handle(&request("", true)).await;
        assert_eq!(a, b);

        let c = engine.handle(&request("8", false)).await;
        let d = engine.handle(&request("8", false)).await;
        assert_eq!(c, d);
    }

    #[tokio::test]
    async fn test_back_navigation_returns_to_previous_step() {
        let (engine, _) = engine(MockCustomers::with("250700000000", None));
        engine.handle(&request("", true)).await;

        let balance = engine.handle(&request("1", false)).await;
        assert_eq!(balance.message, "Your balance is 100.");
        assert_eq!(stored(&engine).await.history, vec!["home".to_string()]);

        let back = engine.handle(&request("0", false)).await;
        assert_eq!(back.message, "1. Balance\n2. Finish\n3. Entries\n4. Terms");
        assert_eq!(back.continuation, ContinuationFlag::Continue);
        let session = stored(&engine).await;
        assert_eq!(session.current_step_id, "home");
        assert!(session.history.is_empty());
    }

    #[tokio::test]
    async fn test_action_extra_data_is_persisted_under_item_key() {
        let (engine, cache) = engine(MockCustomers::with("250700000000", None));
        engine.handle(&request("", true)).await;

        let reply = engine.handle(&request("2", false)).await;
        assert_eq!(reply.message, "Goodbye.");
        assert!(reply.is_ended());

        let extra = engine.store().get_item("S1", EXTRA_ITEM).await.unwrap();
        assert_eq!(extra.get("choice"), Some(&json!("2")));
        assert_eq!(cache.live_keys(), vec!["ussd:S1", "ussd:S1-extra"]);
    }

    #[tokio::test]
    async fn test_action_content_renders_extra_data() {
        let (engine, _) = engine(MockCustomers::with("250700000000", None));
        engine.handle(&request("", true)).await;

        let reply = engine.handle(&request("3", false)).await;
        assert_eq!(reply.message, "No entries yet.");
        assert_eq!(stored(&engine).await.current_step_id, "entries");

        // Catch-all returns home.
        let home = engine.handle(&request("anything", false)).await;
        assert!(home.message.starts_with("1. Balance"));
    }

    #[tokio::test]
    async fn test_exactly_one_session_record() {
        let (engine, cache) = engine(MockCustomers::with("250700000000", None));
        for (input, new_request) in [("", true), ("1", false), ("0", false), ("7", false), ("4", false)] {
            engine.handle(&request(input, new_request)).await;
        }
        let records: Vec<String> = cache
            .live_keys()
            .into_iter()
            .filter(|k| k == "ussd:S1")
            .collect();
        assert_eq!(records.len(), 1);
    }

    #[tokio::test]
    async fn test_rejected_action_ends_session_and_next_request_starts_over() {
        let (engine, _) = engine(MockCustomers::with("250700000000", None));
        engine.handle(&request("", true)).await;

        let reply = engine.handle(&request("5", false)).await;
        assert_eq!(reply.message, "Not eligible.");
        assert_eq!(reply.continuation, ContinuationFlag::End);
        let session = stored(&engine).await;
        assert_eq!(session.status, SessionStatus::Ended);
        assert_eq!(session.last_response.as_deref(), Some("Not eligible."));

        // Same id again: the balance rule must not fire mid-flow.
        let next = engine.handle(&request("1", false)).await;
        assert_eq!(next.message, "1. Balance\n2. Finish\n3. Entries\n4. Terms");
        assert_eq!(next.continuation, ContinuationFlag::Continue);
        let session = stored(&engine).await;
        assert!(session.is_active());
        assert_eq!(session.current_step_id, "home");
    }

    #[tokio::test]
    async fn test_continuation_over_the_limit_is_paginated_again() {
        let (engine, _) = engine(MockCustomers::with("250700000000", None));
        engine.handle(&request("", true)).await;

        let first = engine.handle(&request("6", false)).await;
        assert_eq!(first.message, format!("{}\nn. More", "a".repeat(100)));
        assert_eq!(first.continuation, ContinuationFlag::Continue);

        let second = engine.handle(&request("n", false)).await;
        assert_eq!(second.message, format!("{}\nn. More", "b".repeat(100)));
        assert_eq!(second.continuation, ContinuationFlag::Continue);
        assert!(stored(&engine).await.has_continuation());

        let third = engine.handle(&request("n", false)).await;
        assert_eq!(third.message, "c".repeat(100));
        assert_eq!(third.continuation, ContinuationFlag::End);
        let session = stored(&engine).await;
        assert_eq!(session.status, SessionStatus::Ended);
        assert!(!session.has_continuation());
    }

    #[tokio::test]
    async fn test_unknown_action_at_runtime_is_generic_failure() {
        // Bypass load-time verification to reach the runtime path.
        let engine: TestEngine = UssdEngine {
            store: SessionStore::new(
                MemoryCacheStore::new(),
                Duration::from_secs(120),
                Duration::from_secs(1),
            ),
            customers: MockCustomers::with("250700000000", None),
            registry: ActionRegistry::new(),
            menu: SharedMenu::new(menu()),
            paginator: Paginator::new(160),
            settings: EngineSettings::default(),
            locks: SessionLocks::new(),
        };
        engine.handle(&request("", true)).await;

        let reply = engine.handle(&request("3", false)).await;
        assert_eq!(reply.message, system_error());
        assert_eq!(reply.continuation, ContinuationFlag::End);

        let session = stored(&engine).await;
        assert_eq!(session.status, SessionStatus::Ended);
        assert_eq!(session.current_step_id, "home");
    }

    #[tokio::test]
    async fn test_new_rejects_menu_with_unregistered_action() {
        let result = UssdEngine::new(
            MemoryCacheStore::new(),
            MockCustomers::default(),
            ActionRegistry::with_builtins(),
            menu(),
            EngineSettings::default(),
        );
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_reload_keeps_old_menu_on_error() {
        let (engine, _) = engine(MockCustomers::default());
        let broken = StepCatalog::from_toml("[steps.home]\ncontent = \"x\"\n").unwrap();
        assert!(
            engine
                .reload_menu(MenuDefinition::new(broken, localizer()))
                .is_err()
        );
        assert!(engine.menu().catalog.contains("onboarding"));
    }

    #[tokio::test]
    async fn test_store_failure_ends_session_generically() {
        let engine = UssdEngine::new(
            DownCache,
            MockCustomers::default(),
            registry(),
            menu(),
            EngineSettings::default(),
        )
        .unwrap();
        let reply = engine.handle(&request("1", false)).await;
        assert_eq!(reply.message, system_error());
        assert_eq!(reply.continuation, ContinuationFlag::End);
    }

    #[tokio::test]
    async fn test_repository_failure_ends_session_generically() {
        let customers = MockCustomers {
            fail: true,
            ..Default::default()
        };
        let (engine, cache) = engine(customers);
        let reply = engine.handle(&request("", true)).await;
        assert_eq!(reply.message, system_error());
        assert!(reply.is_ended());
        assert!(cache.live_keys().is_empty());
    }

    #[tokio::test]
    async fn test_invalid_request_is_rejected() {
        let (engine, cache) = engine(MockCustomers::default());
        let mut bad = request("", true);
        bad.msisdn = "  ".to_string();
        let reply = engine.handle(&bad).await;
        assert!(reply.is_ended());
        assert!(cache.is_empty());
    }

    #[tokio::test]
    async fn test_concurrent_requests_for_one_session_are_serialized() {
        let (engine, _) = engine(MockCustomers::with("250700000000", None));
        let engine = Arc::new(engine);
        engine.handle(&request("", true)).await;

        let mut handles = Vec::new();
        for _ in 0..4 {
            let engine = Arc::clone(&engine);
            handles.push(tokio::spawn(async move {
                engine.handle(&request("7", false)).await
            }));
        }
        for handle in handles {
            let reply = handle.await.unwrap();
            assert_eq!(reply.continuation, ContinuationFlag::Continue);
        }
        assert_eq!(stored(&engine).await.current_step_id, "home");
        assert!(engine.locks.is_empty());
    }
}
