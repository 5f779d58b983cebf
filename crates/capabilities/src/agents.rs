//! Agent wiring — registries, personas and sub-loop factories for the
//! main, post and tutorial loops.
//!
//! Sub-agent registries are built once, up front. Delegation actions on the
//! main registry hold a factory that stamps out a fresh sub-loop per call,
//! seeded with the delegation's arguments as context.

use curator_agent::{DecisionOracle, DelegateAction, DispatchLoop, SubLoopFactory, Throttle};
use curator_core::action::{ActionRegistry, ActionSpec, Capability, ParamSpec, ParamType};
use curator_core::error::RegistryError;
use curator_core::event::EventBus;
use curator_core::memory::DecisionMemory;
use curator_core::persona::Persona;
use serde_json::{Value, json};
use std::path::PathBuf;
use std::sync::Arc;

use crate::content::{Analytics, ContentKind, ContentStore};
use crate::editorial::{CategoriesAction, DetailsAction, UpdateContentAction};
use crate::personas;
use crate::post::PostQualityAction;
use crate::site::{PostBySlugAction, TopBounceUrlsAction};
use crate::tutorial::{PrerequisitesAction, TutorialStructureAction};

pub const MAIN_SCOPE: &str = "main";
pub const POST_SCOPE: &str = "post_agent";
pub const TUTORIAL_SCOPE: &str = "tutorial_agent";

/// Default task label handed to a delegate.
pub const DEFAULT_TASK: &str = "analyze_and_improve";

/// Everything the agents share.
pub struct AgentDeps {
    pub store: Arc<dyn ContentStore>,
    pub analytics: Arc<dyn Analytics>,
    pub memory: Arc<dyn DecisionMemory>,
    pub oracle: Arc<DecisionOracle>,
    pub throttle: Arc<dyn Throttle>,
    pub event_bus: Option<Arc<EventBus>>,
    pub max_iterations: Option<u32>,
    pub site_ids: Vec<u32>,
    /// Markdown appended to every persona.
    pub context_file: Option<PathBuf>,
}

pub struct AgentSet {
    deps: AgentDeps,
    main_persona: Persona,
    post_persona: Persona,
    tutorial_persona: Persona,
    post_registry: Arc<ActionRegistry>,
    tutorial_registry: Arc<ActionRegistry>,
}

impl AgentSet {
    pub fn new(deps: AgentDeps) -> Result<Arc<Self>, RegistryError> {
        let with_context = |persona: Persona| match &deps.context_file {
            Some(path) => persona.with_context_file(path),
            None => persona,
        };
        let main_persona = with_context(personas::main_persona(&deps.site_ids));
        let post_persona = with_context(personas::post_persona());
        let tutorial_persona = with_context(personas::tutorial_persona());

        let post_registry = Arc::new(ActionRegistry::builder().register_all(post_actions(&deps.store)).build()?);
        let tutorial_registry = Arc::new(ActionRegistry::builder().register_all(tutorial_actions(&deps.store)).build()?);

        Ok(Arc::new(Self {
            deps,
            main_persona,
            post_persona,
            tutorial_persona,
            post_registry,
            tutorial_registry,
        }))
    }

    pub fn memory(&self) -> &Arc<dyn DecisionMemory> {
        &self.deps.memory
    }

    fn configure(&self, dispatch: DispatchLoop) -> DispatchLoop {
        let dispatch = dispatch
            .with_throttle(self.deps.throttle.clone())
            .with_max_iterations(self.deps.max_iterations);
        match &self.deps.event_bus {
            Some(bus) => dispatch.with_event_bus(bus.clone()),
            None => dispatch,
        }
    }

    /// A post loop working on the item named in `context`.
    pub fn post_loop(&self, context: Value) -> DispatchLoop {
        self.configure(
            DispatchLoop::new(
                POST_SCOPE,
                self.post_persona.clone(),
                self.post_registry.clone(),
                self.deps.memory.clone(),
                self.deps.oracle.clone(),
            )
            .with_context(context),
        )
    }

    pub fn tutorial_loop(&self, context: Value) -> DispatchLoop {
        self.configure(
            DispatchLoop::new(
                TUTORIAL_SCOPE,
                self.tutorial_persona.clone(),
                self.tutorial_registry.clone(),
                self.deps.memory.clone(),
                self.deps.oracle.clone(),
            )
            .with_context(context),
        )
    }

    /// The main loop, with delegation actions bound to this set's sub-loops.
    pub fn main_loop(self: &Arc<Self>) -> Result<DispatchLoop, RegistryError> {
        let post_set = Arc::clone(self);
        let post_factory: Arc<dyn SubLoopFactory> = Arc::new(move |context: Value| post_set.post_loop(context));
        let tutorial_set = Arc::clone(self);
        let tutorial_factory: Arc<dyn SubLoopFactory> =
            Arc::new(move |context: Value| tutorial_set.tutorial_loop(context));

        let registry = ActionRegistry::builder()
            .register_all(main_actions(&self.deps.analytics, &self.deps.store))
            .register(Arc::new(DelegateAction::new(
                delegation_spec(ContentKind::Post),
                POST_SCOPE,
                post_factory,
            )))
            .register(Arc::new(DelegateAction::new(
                delegation_spec(ContentKind::Tutorial),
                TUTORIAL_SCOPE,
                tutorial_factory,
            )))
            .build()?;

        Ok(self.configure(DispatchLoop::new(
            MAIN_SCOPE,
            self.main_persona.clone(),
            Arc::new(registry),
            self.deps.memory.clone(),
            self.deps.oracle.clone(),
        )))
    }
}

/// Context handed to a delegate: the target slug and a task label.
pub fn delegate_context(slug: &str, task: &str) -> Value {
    json!({ "slug": slug, "task": task })
}

pub fn main_actions(analytics: &Arc<dyn Analytics>, store: &Arc<dyn ContentStore>) -> Vec<Arc<dyn Capability>> {
    vec![
        Arc::new(TopBounceUrlsAction::new(analytics.clone())),
        Arc::new(PostBySlugAction::new(store.clone())),
    ]
}

pub fn post_actions(store: &Arc<dyn ContentStore>) -> Vec<Arc<dyn Capability>> {
    vec![
        Arc::new(DetailsAction::new(ContentKind::Post, store.clone())),
        Arc::new(UpdateContentAction::new(ContentKind::Post, store.clone())),
        Arc::new(CategoriesAction::new(ContentKind::Post, store.clone())),
        Arc::new(PostQualityAction::new(store.clone())),
    ]
}

pub fn tutorial_actions(store: &Arc<dyn ContentStore>) -> Vec<Arc<dyn Capability>> {
    vec![
        Arc::new(DetailsAction::new(ContentKind::Tutorial, store.clone())),
        Arc::new(UpdateContentAction::new(ContentKind::Tutorial, store.clone())),
        Arc::new(CategoriesAction::new(ContentKind::Tutorial, store.clone())),
        Arc::new(TutorialStructureAction::new(store.clone())),
        Arc::new(PrerequisitesAction::new(store.clone())),
    ]
}

fn delegation_spec(kind: ContentKind) -> ActionSpec {
    let noun = kind.as_str();
    ActionSpec::new(
        format!("delegate_to_{noun}_agent"),
        format!("Delegate work on a {noun} to the specialized {noun} agent, which runs until it is done"),
    )
    .param(ParamSpec::required("slug", ParamType::String, format!("The {noun} slug")))
    .param(ParamSpec::optional("task", ParamType::String, json!(DEFAULT_TASK), "What the agent should do"))
    .returns("Summary with the agent's last recorded action and result")
}
