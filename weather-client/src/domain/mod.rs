pub mod observation;
pub mod yearly_stat;

pub use observation::Observation;
pub use yearly_stat::YearlyStat;
