pub mod analyzers;
pub mod decompress;
pub mod fragments;
pub mod output;
pub mod profile;
pub mod record;
