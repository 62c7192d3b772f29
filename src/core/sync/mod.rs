/*!
 * Synchronization Primitives
 *
 * Handoff primitives used between caller threads and the worker:
 * - `ResultChannel`: one-shot value handoff for blocking calls
 * - `InitBarrier`: one-time gate released after engine construction
 *
 * # Use Cases
 *
 * - **Blocking calls**: park the caller until its operation has executed
 * - **Construction-time properties**: park readers until the engine exists
 */

mod barrier;
mod result_channel;

pub use barrier::InitBarrier;
pub use result_channel::{result_channel, ResultReceiver, ResultSender};
