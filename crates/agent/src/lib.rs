//! The dispatch runtime — the decide → execute → record cycle.
//!
//! A [`DispatchLoop`] repeatedly:
//!
//! 1. **Renders** a prompt from persona, action catalog, current state and memory
//! 2. **Asks** the [`DecisionOracle`] which action to take next
//! 3. **Records** the decision in its memory scope
//! 4. **Executes** the action with coerced arguments
//! 5. **Records** the result and throttles before the next round
//!
//! The loop ends when the oracle sets `stop`, or fails when its output
//! cannot be used. Loops nest through [`DelegateAction`].

pub mod coerce;
pub mod delegate;
pub mod dispatch;
pub mod oracle;
pub mod prompt;
pub mod throttle;

#[cfg(test)]
mod test_helpers;

pub use delegate::{DelegateAction, SubLoopFactory};
pub use dispatch::{DispatchLoop, LoopFailure, LoopOutcome, LoopPhase};
pub use oracle::DecisionOracle;
pub use throttle::{FixedDelay, NoDelay, Throttle};
