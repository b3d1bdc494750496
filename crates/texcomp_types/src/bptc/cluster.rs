//! A bag of up to 16 RGBA points (an `RgbaCluster`) and the principal-axis
//! extraction used to seed BPTC endpoint search.

/// Per-channel weights the error metric applies when comparing quantized
/// interpolants against a cluster's original points.
#[derive(Debug, Clone, Copy)]
pub struct ErrorMetric {
	/// Per-channel weights, in RGBA order.
	pub weights: [f32; 4],
}

impl ErrorMetric {
	/// Uniform weights: `{1, 1, 1, 1}`.
	pub const UNIFORM: Self = Self { weights: [1.0, 1.0, 1.0, 1.0] };

	/// Perceptual luma-ish weights: `{sqrt(0.3), sqrt(0.56), sqrt(0.11), 1}`.
	pub fn perceptual() -> Self {
		Self {
			weights: [0.3f32.sqrt(), 0.56f32.sqrt(), 0.11f32.sqrt(), 1.0],
		}
	}
}

/// A 4-component float vector used for cluster math (channel order R,G,B,A).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Vec4(pub [f32; 4]);

impl Vec4 {
	/// The zero vector.
	pub const ZERO: Self = Self([0.0; 4]);

	/// Builds a vector from an RGBA [`crate::pixel::Pixel`].
	pub fn from_pixel(p: crate::pixel::Pixel) -> Self {
		Self([
			f32::from(p.channel(crate::pixel::R)),
			f32::from(p.channel(crate::pixel::G)),
			f32::from(p.channel(crate::pixel::B)),
			f32::from(p.channel(crate::pixel::A)),
		])
	}

	/// Dot product.
	pub fn dot(self, other: Self) -> f32 {
		(0..4).map(|i| self.0[i] * other.0[i]).sum()
	}

	/// Squared Euclidean length.
	pub fn length_sq(self) -> f32 {
		self.dot(self)
	}

	/// Euclidean length.
	pub fn length(self) -> f32 {
		self.length_sq().sqrt()
	}

	/// Normalizes in place; leaves the zero vector untouched.
	pub fn normalize(self) -> Self {
		let len = self.length();
		if len <= f32::EPSILON {
			self
		} else {
			self * (1.0 / len)
		}
	}

	/// Weighted squared distance under `metric`.
	pub fn weighted_distance_sq(self, other: Self, metric: ErrorMetric) -> f32 {
		(0..4)
			.map(|i| {
				let d = self.0[i] - other.0[i];
				metric.weights[i] * d * d
			})
			.sum()
	}
}

impl std::ops::Sub for Vec4 {
	type Output = Vec4;
	fn sub(self, rhs: Vec4) -> Vec4 {
		Vec4(std::array::from_fn(|i| self.0[i] - rhs.0[i]))
	}
}

impl std::ops::Add for Vec4 {
	type Output = Vec4;
	fn add(self, rhs: Vec4) -> Vec4 {
		Vec4(std::array::from_fn(|i| self.0[i] + rhs.0[i]))
	}
}

impl std::ops::Mul<f32> for Vec4 {
	type Output = Vec4;
	fn mul(self, rhs: f32) -> Vec4 {
		Vec4(std::array::from_fn(|i| self.0[i] * rhs))
	}
}

/// A symmetric 4x4 covariance matrix, stored row-major.
struct Mat4([[f32; 4]; 4]);

impl Mat4 {
	fn mul_vec(&self, v: Vec4) -> Vec4 {
		Vec4(std::array::from_fn(|i| (0..4).map(|j| self.0[i][j] * v.0[j]).sum()))
	}

	/// Dominant eigenvector/eigenvalue via power iteration with a fixed
	/// iteration cap, matching the reference encoder's `PowerMethod`.
	fn power_method(&self) -> (Vec4, f32, u32) {
		let mut v = Vec4([1.0, 1.0, 1.0, 1.0]).normalize();
		let mut eigenvalue = 0.0f32;
		let max_iters = 40;
		let mut iters = 0;
		for _ in 0..max_iters {
			iters += 1;
			let next = self.mul_vec(v);
			let len = next.length();
			if len <= f32::EPSILON {
				return (v, 0.0, iters);
			}
			let next = next * (1.0 / len);
			if (next - v).length() < 1e-6 {
				v = next;
				eigenvalue = len;
				break;
			}
			v = next;
			eigenvalue = len;
		}
		(v, eigenvalue, iters)
	}
}

/// A bag of up to 16 RGBA points plus cached bounding box and mean.
///
/// Membership is only mutated by [`RgbaCluster::add_point`]; the cached
/// principal axis is recomputed on demand and not invalidated automatically,
/// so callers must not add points mid-optimization-pass.
#[derive(Debug, Clone)]
pub struct RgbaCluster {
	points: Vec<Vec4>,
	min: Vec4,
	max: Vec4,
	sum: Vec4,
}

impl Default for RgbaCluster {
	fn default() -> Self {
		Self::new()
	}
}

impl RgbaCluster {
	/// Creates an empty cluster.
	pub fn new() -> Self {
		Self {
			points: Vec::with_capacity(16),
			min: Vec4([f32::MAX; 4]),
			max: Vec4([f32::MIN; 4]),
			sum: Vec4::ZERO,
		}
	}

	/// Adds a point to the cluster, updating the bounding box and mean.
	pub fn add_point(&mut self, p: Vec4) {
		for i in 0..4 {
			self.min.0[i] = self.min.0[i].min(p.0[i]);
			self.max.0[i] = self.max.0[i].max(p.0[i]);
		}
		self.sum = self.sum + p;
		self.points.push(p);
	}

	/// Number of points currently in the cluster.
	pub fn len(&self) -> usize {
		self.points.len()
	}

	/// Whether the cluster has no points.
	pub fn is_empty(&self) -> bool {
		self.points.is_empty()
	}

	/// The cluster's points, in insertion order.
	pub fn points(&self) -> &[Vec4] {
		&self.points
	}

	/// Arithmetic mean of all points.
	pub fn mean(&self) -> Vec4 {
		if self.points.is_empty() {
			Vec4::ZERO
		} else {
			self.sum * (1.0 / self.points.len() as f32)
		}
	}

	/// Axis-aligned bounding box, `(min, max)`.
	pub fn bounding_box(&self) -> (Vec4, Vec4) {
		(self.min, self.max)
	}

	/// True if every point in the cluster is identical.
	pub fn is_degenerate(&self) -> bool {
		self.points.windows(2).all(|w| w[0] == w[1])
	}

	/// Extracts the principal axis of the centered covariance matrix via
	/// power iteration. Returns a zero-length axis for single-point or
	/// degenerate clusters, and the exact direction for collinear clusters
	/// (skipping the eigensolver in both cases, as the reference encoder
	/// does).
	pub fn principal_axis(&self) -> Vec4 {
		if self.points.len() < 2 {
			return Vec4::ZERO;
		}

		let mean = self.mean();
		let centered: Vec<Vec4> = self.points.iter().map(|&p| p - mean).collect();

		let mut unique: Vec<Vec4> = Vec::new();
		for &p in &self.points {
			if !unique.contains(&p) {
				unique.push(p);
			}
		}
		if unique.len() == 1 {
			return Vec4::ZERO;
		}

		let dir = (unique[1] - unique[0]).normalize();
		let collinear = unique.iter().skip(2).all(|&p| {
			let v = p - unique[0];
			(v.dot(dir).abs() - v.length()).abs() <= 1e-5
		});
		if collinear {
			return dir;
		}

		let mut cov = [[0.0f32; 4]; 4];
		for i in 0..4 {
			for j in 0..=i {
				let sum: f32 = centered.iter().map(|p| p.0[i] * p.0[j]).sum();
				let v = sum / 3.0;
				cov[i][j] = v;
				cov[j][i] = v;
			}
		}

		let (axis, _eigenvalue, _iters) = Mat4(cov).power_method();
		axis
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn uniform_cluster_has_zero_axis() {
		let mut c = RgbaCluster::new();
		for _ in 0..4 {
			c.add_point(Vec4([10.0, 10.0, 10.0, 255.0]));
		}
		assert_eq!(c.principal_axis(), Vec4::ZERO);
		assert!(c.is_degenerate());
	}

	#[test]
	fn collinear_cluster_returns_exact_direction() {
		let mut c = RgbaCluster::new();
		c.add_point(Vec4([0.0, 0.0, 0.0, 255.0]));
		c.add_point(Vec4([10.0, 0.0, 0.0, 255.0]));
		c.add_point(Vec4([20.0, 0.0, 0.0, 255.0]));
		let axis = c.principal_axis();
		assert!(axis.0[0].abs() > 0.99);
	}

	#[test]
	fn bounding_box_tracks_extrema() {
		let mut c = RgbaCluster::new();
		c.add_point(Vec4([0.0, 5.0, 0.0, 255.0]));
		c.add_point(Vec4([10.0, 2.0, 1.0, 255.0]));
		let (min, max) = c.bounding_box();
		assert_eq!(min.0[1], 2.0);
		assert_eq!(max.0[0], 10.0);
	}
}
