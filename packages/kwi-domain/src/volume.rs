use std::ops::Add;

use serde::{Deserialize, Serialize};

/// Channel split assumed when only a total volume is known.
pub const DEFAULT_PC_RATIO: f64 = 0.5;

/// Monthly search counts split by channel.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SearchVolume {
	pc: u64,
	mobile: u64,
}
impl SearchVolume {
	pub const fn new(pc: u64, mobile: u64) -> Self {
		Self { pc, mobile }
	}

	pub const fn zero() -> Self {
		Self { pc: 0, mobile: 0 }
	}

	/// Splits `total` with an estimated PC share. The ratio is clamped to 0.0-1.0 and a
	/// non-finite ratio falls back to [`DEFAULT_PC_RATIO`].
	pub fn from_total(total: u64, pc_ratio: f64) -> Self {
		let ratio = if pc_ratio.is_finite() { pc_ratio.clamp(0.0, 1.0) } else { DEFAULT_PC_RATIO };
		let pc = ((total as f64) * ratio).round() as u64;
		let pc = pc.min(total);

		Self { pc, mobile: total - pc }
	}

	pub const fn pc(&self) -> u64 {
		self.pc
	}

	pub const fn mobile(&self) -> u64 {
		self.mobile
	}

	pub const fn total(&self) -> u64 {
		self.pc.saturating_add(self.mobile)
	}

	pub fn pc_ratio(&self) -> f64 {
		let total = self.total();

		if total == 0 {
			return 0.0;
		}

		self.pc as f64 / total as f64
	}

	pub fn mobile_ratio(&self) -> f64 {
		1.0 - self.pc_ratio()
	}

	pub const fn is_zero(&self) -> bool {
		self.total() == 0
	}
}
impl Add for SearchVolume {
	type Output = Self;

	fn add(self, rhs: Self) -> Self::Output {
		Self { pc: self.pc.saturating_add(rhs.pc), mobile: self.mobile.saturating_add(rhs.mobile) }
	}
}
