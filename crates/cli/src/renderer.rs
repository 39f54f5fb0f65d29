use std::sync::atomic::{AtomicU64, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use rayon::prelude::*;

use freshframe_scheduler::{Image, PixelBuffer, Pose, RenderError, Renderer, Tier};

/// CPU stand-in for a real renderer: ray-casts a checkerboard floor under a
/// sky gradient, then sleeps until the simulated cost for the tier's pixel
/// count has elapsed.
pub struct SyntheticRenderer {
    ms_per_megapixel: f64,
    /// Fraction of calls that fail, in `[0, 1]`.
    failure_rate: f64,
    calls: AtomicU64,
}

impl SyntheticRenderer {
    pub fn new(ms_per_megapixel: f64, failure_rate: f64) -> Self {
        let failure_rate = if failure_rate.is_nan() { 0.0 } else { failure_rate.clamp(0.0, 1.0) };
        Self {
            ms_per_megapixel: ms_per_megapixel.max(0.0),
            failure_rate,
            calls: AtomicU64::new(0),
        }
    }

    /// Deterministic error diffusion: after `n` calls exactly
    /// `floor(n * failure_rate)` of them have failed.
    fn should_fail(&self, call: u64) -> bool {
        let failed_after = |n: u64| (n as f64 * self.failure_rate).floor() as u64;
        failed_after(call) > failed_after(call - 1)
    }

    fn simulated_cost(&self, tier: &Tier) -> Duration {
        let megapixels = tier.pixel_count() as f64 / 1_000_000.0;
        Duration::from_secs_f64(megapixels * self.ms_per_megapixel / 1000.0)
    }
}

impl Renderer for SyntheticRenderer {
    fn render(&self, pose: &Pose, tier: &Tier) -> Result<Image, RenderError> {
        let call = self.calls.fetch_add(1, Ordering::Relaxed) + 1;
        if self.should_fail(call) {
            return Err(RenderError::Unavailable(format!("injected failure on call {call}")));
        }

        let started = Instant::now();
        let camera = Camera::new(pose, tier);
        let width = tier.width as usize;
        let len = Image::expected_len(tier.width, tier.height)
            .ok_or_else(|| RenderError::Failed(format!("tier {tier} is too large to allocate")))?;
        let mut pixels = vec![0.0f32; len];
        pixels
            .par_chunks_mut(width * Image::CHANNELS)
            .enumerate()
            .for_each(|(y, row)| {
                for (x, rgb) in row.chunks_exact_mut(Image::CHANNELS).enumerate() {
                    rgb.copy_from_slice(&camera.shade(x, y));
                }
            });

        if let Some(remaining) = self.simulated_cost(tier).checked_sub(started.elapsed()) {
            thread::sleep(remaining);
        }
        Ok(Image::new(tier.width, tier.height, PixelBuffer::F32(pixels)))
    }
}

/// Pinhole camera derived from a pose (degrees, Y-up) and a tier.
struct Camera {
    origin: [f64; 3],
    forward: [f64; 3],
    right: [f64; 3],
    up: [f64; 3],
    half_height: f64,
    aspect: f64,
    width: f64,
    height: f64,
}

impl Camera {
    fn new(pose: &Pose, tier: &Tier) -> Self {
        let pitch = pose.rotation[0].to_radians();
        let yaw = pose.rotation[1].to_radians();
        let forward = [yaw.sin() * pitch.cos(), pitch.sin(), -yaw.cos() * pitch.cos()];
        let right = [yaw.cos(), 0.0, yaw.sin()];
        let up = cross(right, forward);
        Self {
            origin: pose.position,
            forward,
            right,
            up,
            half_height: (tier.vertical_fov.to_radians() / 2.0).tan(),
            aspect: tier.width as f64 / tier.height as f64,
            width: tier.width as f64,
            height: tier.height as f64,
        }
    }

    fn shade(&self, x: usize, y: usize) -> [f32; 3] {
        let u = ((x as f64 + 0.5) / self.width * 2.0 - 1.0) * self.half_height * self.aspect;
        let v = (1.0 - (y as f64 + 0.5) / self.height * 2.0) * self.half_height;
        let dir: [f64; 3] =
            std::array::from_fn(|i| self.forward[i] + u * self.right[i] + v * self.up[i]);

        // Floor plane y = 0.
        if dir[1] < -1e-6 && self.origin[1] > 0.0 {
            let t = -self.origin[1] / dir[1];
            let hit_x = self.origin[0] + t * dir[0];
            let hit_z = self.origin[2] + t * dir[2];
            let checker = (hit_x.floor() as i64 + hit_z.floor() as i64).rem_euclid(2) == 0;
            let fog = (-t * 0.03).exp() as f32;
            let base = if checker { 0.85 } else { 0.2 };
            let sky = 0.6;
            let c = base * fog + sky * (1.0 - fog);
            return [c, c, c];
        }

        let len = dir.iter().map(|d| d * d).sum::<f64>().sqrt();
        let elevation = (dir[1] / len).max(0.0) as f32;
        [0.6 - 0.4 * elevation, 0.7 - 0.3 * elevation, 0.9]
    }
}

fn cross(a: [f64; 3], b: [f64; 3]) -> [f64; 3] {
    [
        a[1] * b[2] - a[2] * b[1],
        a[2] * b[0] - a[0] * b[2],
        a[0] * b[1] - a[1] * b[0],
    ]
}
