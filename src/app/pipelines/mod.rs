pub mod oer;
pub mod smithsonian;
pub mod wikimedia;

pub use oer::OerPipeline;
pub use smithsonian::SmithsonianPipeline;
pub use wikimedia::WikimediaPipeline;
