/// Application layer: the mirror pipeline and the run loop driving it.
pub mod use_cases;
