mod main;

pub use main::MediaNormalizer;
