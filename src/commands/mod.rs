pub mod bump;
pub mod publish;

pub use bump::run_bump;
pub use publish::run_publish;
