mod dataset;
pub use dataset::*;

mod analyze;
pub use analyze::*;

mod report;
pub use report::*;

mod chart;
pub use chart::*;

mod config;
pub use config::*;

mod assets;
pub use assets::*;

mod logging;
pub use logging::*;
