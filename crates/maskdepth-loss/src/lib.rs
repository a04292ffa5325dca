//! Loss functions for joint mask and depth supervision.
//!
//! Every head of a dual-head model is trained with a weighted sum of a
//! structural term and a pixel term:
//!
//! ```text
//! structural = clamp((1 - S) * 0.5, 0, 1)      S = SSIM or MS-SSIM
//! head       = 0.84 * structural + 0.16 * pixel
//! total      = 2 * head(mask) + 1 * head(depth)
//! ```
//!
//! ## Building blocks
//!
//! - **[`PixelCriterion`]**: L1, MSE or binary cross-entropy on probabilities
//! - **[`Ssim`]**: structural similarity with a Gaussian window
//! - **[`MsSsim`]**: multi-scale structural similarity
//! - **[`HeadLoss`]**: structural + pixel term for one head
//! - **[`DualHeadLoss`]**: weighted mask + depth loss
//! - **[`l1_penalty`]**: sum of absolute parameter values for L1 regularization
//!
//! ## Usage Example
//!
//! ```rust
//! use maskdepth_loss::{DualHeadLossConfig, StructuralKind};
//!
//! let training = DualHeadLossConfig::new();
//! let evaluation = training.for_evaluation();
//!
//! assert_eq!(training.mask.structural, StructuralKind::MsSsim);
//! assert_eq!(evaluation.mask.structural, StructuralKind::Ssim);
//! ```

mod dual_head;
mod head;
mod ms_ssim;
mod pixel;
mod regularization;
mod ssim;

pub use dual_head::{DualHeadLoss, DualHeadLossConfig, DualLoss};
pub use head::{HeadLoss, HeadLossConfig, HeadLossOutput, StructuralKind};
pub use ms_ssim::{MsSsim, MsSsimConfig};
pub use pixel::PixelCriterion;
pub use regularization::l1_penalty;
pub use ssim::{Ssim, SsimConfig, SsimOutput};
