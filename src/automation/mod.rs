pub mod detection;
pub mod injector;
pub mod keys;
pub mod matching;
