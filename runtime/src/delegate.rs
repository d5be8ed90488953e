//! Members of a [`DelegatingStore`](crate::DelegatingStore).
//!
//! A delegate pairs a member store with two functions:
//! - a **scope** that maps a parent action to the member's action, or `None`
//!   when the action does not concern this member
//! - an **expand** that folds a member state into the parent state, and may
//!   emit parent effects while doing so
//!
//! Build delegates with [`DelegateExt::delegate`] (wrapping an existing
//! store) or [`ReducerDelegateExt::delegate`] (building the member store from
//! a reducer).

use crate::store::{StateStore, Store};
use futures::StreamExt;
use futures::stream::BoxStream;
use statefx_core::error::StoreError;
use statefx_core::reducer::{ExpandContext, Reducer};
use std::fmt;
use std::sync::Arc;

/// A member state change, ready to be folded into the parent state
pub trait Expansion<S, A, E>: Send {
    /// Compute the new parent state
    fn expand(self: Box<Self>, ctx: &mut ExpandContext<'_, E, A>, parent: &S) -> S;

    /// `Debug` rendering of the member state, for events
    fn describe(&self) -> String;
}

/// The composite's view of one member.
pub trait Delegate<S, A, E>: Send + Sync {
    /// Forward a parent action, if the scope accepts it.
    ///
    /// Returns once the member has finished its own dispatch.
    ///
    /// # Errors
    ///
    /// Propagates the member's dispatch error.
    fn dispatch(&self, action: &A) -> Result<(), StoreError>;

    /// The member's current state followed by each later one, each wrapped
    /// as an [`Expansion`]
    fn changes(&self) -> BoxStream<'static, Box<dyn Expansion<S, A, E>>>;
}

/// A delegate backed by a [`StateStore`].
pub struct StoreDelegate<St, Sc, Ex> {
    store: St,
    scope: Sc,
    expand: Arc<Ex>,
}

impl<St, Sc, Ex> StoreDelegate<St, Sc, Ex> {
    /// The member store
    pub const fn store(&self) -> &St {
        &self.store
    }
}

impl<St: fmt::Debug, Sc, Ex> fmt::Debug for StoreDelegate<St, Sc, Ex> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StoreDelegate")
            .field("store", &self.store)
            .finish_non_exhaustive()
    }
}

struct MemberState<C, Ex> {
    state: C,
    expand: Arc<Ex>,
}

impl<S, A, E, C, Ex> Expansion<S, A, E> for MemberState<C, Ex>
where
    C: fmt::Debug + Send,
    Ex: Fn(&mut ExpandContext<'_, E, A>, &S, &C) -> S + Send + Sync,
{
    fn expand(self: Box<Self>, ctx: &mut ExpandContext<'_, E, A>, parent: &S) -> S {
        (self.expand)(ctx, parent, &self.state)
    }

    fn describe(&self) -> String {
        format!("{:?}", self.state)
    }
}

impl<S, A, E, St, Sc, Ex> Delegate<S, A, E> for StoreDelegate<St, Sc, Ex>
where
    S: 'static,
    A: 'static,
    E: 'static,
    St: StateStore,
    Sc: Fn(&A) -> Option<St::Action> + Send + Sync + 'static,
    Ex: Fn(&mut ExpandContext<'_, E, A>, &S, &St::State) -> S + Send + Sync + 'static,
{
    fn dispatch(&self, action: &A) -> Result<(), StoreError> {
        match (self.scope)(action) {
            Some(member_action) => self.store.dispatch(member_action),
            None => {
                tracing::trace!("Action out of delegate scope, skipped");
                Ok(())
            },
        }
    }

    fn changes(&self) -> BoxStream<'static, Box<dyn Expansion<S, A, E>>> {
        let expand = Arc::clone(&self.expand);
        self.store
            .observe()
            .map(move |state| {
                Box::new(MemberState {
                    state,
                    expand: Arc::clone(&expand),
                }) as Box<dyn Expansion<S, A, E>>
            })
            .boxed()
    }
}

/// Turn any [`StateStore`] into a delegate.
///
/// ```
/// use statefx_core::reducer::{reducer_fn, Context};
/// use statefx_runtime::{DelegateExt, DelegatingStore, Store};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> Result<(), statefx_core::error::StoreError> {
/// let adder = Store::new(
///     0,
///     reducer_fn(|s: &i32, a: i32, _ctx: &mut Context<'_, (), i32>| Ok(s + a)),
///     (),
/// )?;
///
/// let composite = DelegatingStore::new(
///     0,
///     (),
///     vec![adder.delegate(|action: &i32| Some(*action), |_ctx, _parent, child: &i32| *child)],
/// )?;
/// composite.dispatch(5)?;
/// # Ok(())
/// # }
/// ```
pub trait DelegateExt: StateStore + Sized {
    /// Wrap this store as a delegate of a composite over `S`, `A`, `E`
    fn delegate<S, A, E, Sc, Ex>(self, scope: Sc, expand: Ex) -> Box<dyn Delegate<S, A, E>>
    where
        S: 'static,
        A: 'static,
        E: 'static,
        Sc: Fn(&A) -> Option<Self::Action> + Send + Sync + 'static,
        Ex: Fn(&mut ExpandContext<'_, E, A>, &S, &Self::State) -> S + Send + Sync + 'static,
    {
        Box::new(StoreDelegate {
            store: self,
            scope,
            expand: Arc::new(expand),
        })
    }
}

impl<T: StateStore> DelegateExt for T {}

/// Build a member [`Store`] from a reducer and wrap it as a delegate.
///
/// The member store starts immediately; its reducer's initial effect runs
/// on its own scheduler and reaches the composite like any later change.
pub trait ReducerDelegateExt: Reducer + Sized + Send + Sync + 'static
where
    Self::State: Clone + fmt::Debug + Send + Sync + 'static,
    Self::Action: fmt::Debug + Send + 'static,
    Self::Environment: fmt::Debug + Send + Sync + 'static,
{
    /// Build the member store and wrap it as a delegate
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NoRuntime`] when called outside a Tokio runtime.
    fn delegate<S, A, E, Sc, Ex>(
        self,
        initial_state: Self::State,
        environment: Self::Environment,
        scope: Sc,
        expand: Ex,
    ) -> Result<Box<dyn Delegate<S, A, E>>, StoreError>
    where
        S: 'static,
        A: 'static,
        E: 'static,
        Sc: Fn(&A) -> Option<Self::Action> + Send + Sync + 'static,
        Ex: Fn(&mut ExpandContext<'_, E, A>, &S, &Self::State) -> S + Send + Sync + 'static,
    {
        let store = Store::new(initial_state, self, environment)?;
        Ok(DelegateExt::delegate(store, scope, expand))
    }
}

impl<R> ReducerDelegateExt for R
where
    R: Reducer + Send + Sync + 'static,
    R::State: Clone + fmt::Debug + Send + Sync + 'static,
    R::Action: fmt::Debug + Send + 'static,
    R::Environment: fmt::Debug + Send + Sync + 'static,
{
}
