//! First-match conditional dispatch.
//!
//! [`ConditionalChain`] tests predicates against the context in registration
//! order and hands the run to the first branch whose predicate holds. A
//! branch is any [`Chainable`], so it can be a closure (via
//! [`chain_fn`](crate::chain_fn)) or a whole nested chain.

use crate::chainable::{BoxFut, Chainable};
use crate::context::Context;
use crate::dispatch::Dispatch;
use crate::error::{ChainError, Result};
use crate::events::Event;
use crate::prompt::Prompt;
use serde_json::Value;

type SyncPredicate = Box<dyn Fn(&Context) -> bool + Send + Sync>;
type AsyncPredicate = Box<dyn for<'a> Fn(&'a Context) -> BoxFut<'a, Result<bool>> + Send + Sync>;

enum Predicate {
    Sync(SyncPredicate),
    Async(AsyncPredicate),
}

impl Predicate {
    async fn holds(&self, context: &Context) -> Result<bool> {
        match self {
            Predicate::Sync(f) => Ok(f(context)),
            Predicate::Async(f) => f(context).await,
        }
    }
}

struct Branch<P: ?Sized + Sync> {
    predicate: Predicate,
    action: Box<dyn Chainable<P>>,
}

/// Runs the first branch whose predicate matches the context.
///
/// If no predicate matches, the default branch runs; without a default the
/// run fails with [`ChainError::NoMatchingBranch`]. Predicates after the
/// first match are never evaluated, and a failing async predicate ends the
/// run with its error.
///
/// # Example
///
/// ```
/// use llm_chainable::{chain_fn, ConditionalChain, Context, MockProvider, ProviderDispatch, RecursiveChain};
/// use serde_json::json;
///
/// # tokio_test::block_on(async {
/// let router = ConditionalChain::<MockProvider>::new("support")
///     .add_branch(|ctx: &Context| ctx.get_str("tier") == Some("gold"), RecursiveChain::new(2))
///     .set_default_branch(chain_fn::<MockProvider, _>(|_ctx, _p, _d, _prompts| {
///         Box::pin(async move { Ok(json!("standard queue")) })
///     }));
///
/// let mut ctx = Context::new().with("tier", "bronze");
/// let out = router
///     .run(&mut ctx, &MockProvider::echo(), &ProviderDispatch, &[])
///     .await
///     .unwrap();
/// assert_eq!(out, json!("standard queue"));
/// # });
/// ```
pub struct ConditionalChain<P: ?Sized + Sync> {
    name: String,
    branches: Vec<Branch<P>>,
    default_branch: Option<Box<dyn Chainable<P>>>,
}

impl<P: ?Sized + Sync> ConditionalChain<P> {
    /// Create a conditional chain with no branches.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            branches: Vec::new(),
            default_branch: None,
        }
    }

    /// Register a branch guarded by a synchronous predicate.
    pub fn add_branch<F, C>(mut self, predicate: F, action: C) -> Self
    where
        F: Fn(&Context) -> bool + Send + Sync + 'static,
        C: Chainable<P> + 'static,
    {
        self.branches.push(Branch {
            predicate: Predicate::Sync(Box::new(predicate)),
            action: Box::new(action),
        });
        self
    }

    /// Register a branch guarded by an asynchronous predicate.
    ///
    /// A predicate error aborts the run unchanged; no later branch is tried.
    pub fn add_async_branch<F, C>(mut self, predicate: F, action: C) -> Self
    where
        F: for<'a> Fn(&'a Context) -> BoxFut<'a, Result<bool>> + Send + Sync + 'static,
        C: Chainable<P> + 'static,
    {
        self.branches.push(Branch {
            predicate: Predicate::Async(Box::new(predicate)),
            action: Box::new(action),
        });
        self
    }

    /// Set the branch that runs when no predicate matches. Replaces any
    /// previous default.
    pub fn set_default_branch<C>(mut self, action: C) -> Self
    where
        C: Chainable<P> + 'static,
    {
        self.default_branch = Some(Box::new(action));
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn branch_count(&self) -> usize {
        self.branches.len()
    }

    pub fn has_default_branch(&self) -> bool {
        self.default_branch.is_some()
    }

    /// Select a branch against `context` and execute it.
    ///
    /// The chosen branch receives the same context, provider, dispatch and
    /// prompts; its result and errors are returned unchanged.
    pub async fn run(
        &self,
        context: &mut Context,
        provider: &P,
        dispatch: &dyn Dispatch<P>,
        prompts: &[Prompt],
    ) -> Result<Value> {
        let mut selected = None;
        for (index, branch) in self.branches.iter().enumerate() {
            if branch.predicate.holds(context).await? {
                selected = Some((Some(index), branch.action.as_ref()));
                break;
            }
        }

        let (branch, action) = match (selected, &self.default_branch) {
            (Some(hit), _) => hit,
            (None, Some(default)) => (None, default.as_ref()),
            (None, None) => return Err(ChainError::NoMatchingBranch),
        };

        context.emit(Event::BranchSelected {
            chain: self.name.clone(),
            branch,
        });
        action.execute(context, provider, dispatch, prompts).await
    }
}

impl<P: ?Sized + Sync> std::fmt::Debug for ConditionalChain<P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConditionalChain")
            .field("name", &self.name)
            .field(
                "branches",
                &self.branches.iter().map(|b| b.action.kind()).collect::<Vec<_>>(),
            )
            .field(
                "default_branch",
                &self.default_branch.as_ref().map(|d| d.kind()),
            )
            .finish()
    }
}

impl<P: ?Sized + Sync> Chainable<P> for ConditionalChain<P> {
    fn kind(&self) -> &'static str {
        "conditional"
    }

    fn execute<'a>(
        &'a self,
        context: &'a mut Context,
        provider: &'a P,
        dispatch: &'a dyn Dispatch<P>,
        prompts: &'a [Prompt],
    ) -> BoxFut<'a, Result<Value>> {
        Box::pin(self.run(context, provider, dispatch, prompts))
    }
}
