//! Property-based tests for dispatch
//!
//! For any action sequence, the state read right after each `dispatch` is
//! exactly what the reducer computes from the previous state.

#![allow(clippy::unwrap_used)]

use proptest::prelude::*;
use statefx_core::error::ReduceError;
use statefx_core::reducer::{Context, Reducer};
use statefx_runtime::{Store, StoreConfig};
use statefx_testing::properties::action_sequence;

#[derive(Clone, Debug, Default, PartialEq)]
struct Inventory {
    stock: u32,
    history: Vec<u32>,
}

#[derive(Clone, Debug)]
enum InventoryAction {
    Receive(u32),
    Ship(u32),
    Restock,
}

struct InventoryReducer;

impl Reducer for InventoryReducer {
    type State = Inventory;
    type Action = InventoryAction;
    type Environment = u32;

    fn reduce(
        &self,
        state: &Inventory,
        action: InventoryAction,
        ctx: &mut Context<'_, u32, InventoryAction>,
    ) -> Result<Inventory, ReduceError> {
        let stock = match action {
            InventoryAction::Receive(n) => state.stock.saturating_add(n),
            InventoryAction::Ship(n) if n > state.stock => {
                return Err(ReduceError::rejected("not enough stock"));
            },
            InventoryAction::Ship(n) => state.stock - n,
            InventoryAction::Restock => {
                ctx.cancel_effect("restock");
                state.stock.max(*ctx.environment())
            },
        };
        let mut history = state.history.clone();
        history.push(stock);
        Ok(Inventory { stock, history })
    }
}

fn inventory_action() -> impl Strategy<Value = InventoryAction> {
    prop_oneof![
        (0..50_u32).prop_map(InventoryAction::Receive),
        (0..50_u32).prop_map(InventoryAction::Ship),
        Just(InventoryAction::Restock),
    ]
}

proptest! {
    #[test]
    fn published_state_equals_reducer_output(actions in action_sequence(inventory_action(), 64)) {
        let runtime = tokio::runtime::Builder::new_current_thread().build().unwrap();
        let config = StoreConfig::default().with_runtime(runtime.handle().clone());
        let store = Store::with_config(Inventory::default(), InventoryReducer, 20, config).unwrap();

        let mut expected = Inventory::default();
        for action in actions {
            let mut ctx = Context::new(&20);
            let outcome = InventoryReducer.reduce(&expected, action.clone(), &mut ctx);
            let dispatched = store.dispatch(action);

            match outcome {
                Ok(next) => {
                    prop_assert!(dispatched.is_ok());
                    expected = next;
                }
                Err(_) => {
                    prop_assert!(dispatched.is_err());
                }
            }
            prop_assert_eq!(store.state(), expected.clone());
        }
    }
}
