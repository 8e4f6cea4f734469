pub mod definition;
pub mod profile;

pub use definition::Quality;
pub use profile::QualityProfile;
