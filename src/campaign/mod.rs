//! Campaign records this crate reads and writes
//!
//! Only the narrow slice of the campaign a battle touches is modelled:
//! identity, status and assignment of units, personnel and forces, plus the
//! scenario and contract definitions that drive a launch.

pub mod contract;
pub mod force;
pub mod personnel;
pub mod scenario;
pub mod state;
pub mod unit;

pub use contract::Contract;
pub use force::{Force, ForceRole};
pub use personnel::{Kill, Person, PersonStatus, LETHAL_HITS};
pub use scenario::{BoardSource, ForceDescriptor, MapSpec, Scenario, ScenarioStatus};
pub use state::Campaign;
pub use unit::{Unit, UnitCondition, UnitStatus};
