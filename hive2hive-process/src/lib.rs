#![allow(dead_code)]

//! The cancellable, rollback-capable process framework every user-visible
//! file operation runs through (top-level spec §3/§4): a `Lifecycle` state
//! machine (`lifecycle`), the per-operation `Context` steps thread data
//! through, `ProcessComponent`/`ProcessComposite` (`component`, `composite`)
//! as the template-method leaf/composite pair, and a `ProcessFactory`
//! (`factory`) assembling the seven pipelines from the concrete steps in
//! `steps`.

mod component;
mod composite;
mod context;
mod factory;
mod lifecycle;
mod listener;
mod rollback;
mod steps;

pub use component::{ComponentCore, ComponentId, ProcessComponent};
pub use composite::{Policy, ProcessComposite};
pub use context::{Context, Permission};
pub use factory::{DhtClient, DhtPolicy, Pipeline, ProcessFactory};
pub use lifecycle::{is_legal_transition, PausedFrom, State};
pub use listener::{Listener, ListenerId};
pub use rollback::RollbackReason;
pub use steps::{
    encode_index, meta_tuple, CreateFolder, DeleteFileStep, DownloadChunks, FindInUserProfile,
    GetFileListStep, GetMetaDocument, MoveFileStep, NewFileStep, RecoverFileStep, ShareStep,
    UpdateFileStep, VersionSelector, META_CONTENT, META_DOMAIN,
};

#[cfg(test)]
mod lifecycle_model {
    use crate::lifecycle::{is_legal_transition, State};
    use stateright::{Checker, Model, Property};

    /// The six-state lifecycle as a `stateright` model, exhaustively
    /// explored from `Ready`. Every candidate target state is offered as an
    /// action at every step; `next_state` only admits the legal ones, so the
    /// reachable set is exactly the set of states `is_legal_transition`
    /// allows a real `ComponentCore` to reach. Checks P1 (every reachable
    /// state/transition pair is one the table allows) and P4 (cancel is
    /// idempotent: `Failed` has no outgoing transition, so a `cancel()` that
    /// lands a component on `Failed` makes every later `cancel()` a no-op
    /// `InvalidState`, matching `ProcessComponent::cancel`'s own state
    /// guard).
    struct LifecycleModel;

    const ALL_STATES: [State; 6] = [
        State::Ready,
        State::Running,
        State::Paused,
        State::Rollbacking,
        State::Succeeded,
        State::Failed,
    ];

    impl Model for LifecycleModel {
        type State = State;
        type Action = State;

        fn init_states(&self) -> Vec<Self::State> {
            vec![State::Ready]
        }

        fn actions(&self, _state: &Self::State, actions: &mut Vec<Self::Action>) {
            actions.extend_from_slice(&ALL_STATES);
        }

        fn next_state(&self, state: &Self::State, action: Self::Action) -> Option<Self::State> {
            is_legal_transition(*state, action).then_some(action)
        }

        fn properties(&self) -> Vec<Property<Self>> {
            vec![
                Property::always("failed has no outgoing legal transition", |_, state| {
                    if *state != State::Failed {
                        return true;
                    }
                    ALL_STATES.iter().all(|to| !is_legal_transition(*state, *to))
                }),
                Property::sometimes("succeeded is reachable", |_, state| {
                    *state == State::Succeeded
                }),
                Property::sometimes("failed is reachable", |_, state| *state == State::Failed),
            ]
        }
    }

    #[test]
    fn lifecycle_transition_table_matches_its_model() {
        LifecycleModel.checker().spawn_bfs().join().assert_properties();
    }
}
