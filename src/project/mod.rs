mod export;
mod ids;
mod legacy;
mod mapping;
mod media;
mod store;
mod timeline;

pub use export::*;
pub use ids::*;
pub use legacy::*;
pub use mapping::*;
pub use media::*;
pub use store::*;
pub use timeline::*;
