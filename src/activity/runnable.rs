/*!
 * Runnable Contract
 * The generic init/step/finalize interface an activity drives
 */

/// Unit of work driven by an [`Activity`](super::Activity)
///
/// All three methods are called from the activity's thread, in the order the
/// runnables were added. Runnables are shared handles: an activity never owns
/// them exclusively, and no runnable belongs to two activities.
pub trait Runnable: Send + Sync {
    /// Called once before the drive loop
    fn init(&self);

    /// Called once per period or per trigger
    fn step(&self);

    /// Called once after the drive loop exits
    fn finalize(&self);

    /// Label used in diagnostics
    fn label(&self) -> &str {
        "runnable"
    }
}
