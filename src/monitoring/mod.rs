/*!
 * Monitoring
 * Structured logging and per-operation tracing
 */

mod tracer;

pub use tracer::{init_tracing, OperationSpan};
