pub mod bundle_reader;
pub mod bundle_writer;
pub mod bundler;
pub mod classifier;
pub mod config_resolver;
pub mod extractor;
pub mod file_collector;
