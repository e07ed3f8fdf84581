//! Axis-aligned bounding boxes and the view frustum they are culled against.

use cgmath::{InnerSpace, Matrix, Matrix4, SquareMatrix, Vector3, Vector4};

/// Axis-aligned bounding box, stored the same way on disk and in memory.
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct BoundingBox {
    pub min: [f32; 3],
    pub max: [f32; 3],
}

impl BoundingBox {
    pub fn new(min: [f32; 3], max: [f32; 3]) -> Self {
        Self { min, max }
    }

    /// An inverted box that any point expands into a valid one.
    pub fn empty() -> Self {
        Self {
            min: [f32::MAX; 3],
            max: [f32::MIN; 3],
        }
    }

    pub fn from_points<'a>(points: impl IntoIterator<Item = &'a [f32; 3]>) -> Self {
        let mut bbox = Self::empty();
        for p in points {
            bbox.expand(*p);
        }
        bbox
    }

    pub fn is_empty(&self) -> bool {
        (0..3).any(|i| self.min[i] > self.max[i])
    }

    pub fn expand(&mut self, p: [f32; 3]) {
        for i in 0..3 {
            self.min[i] = self.min[i].min(p[i]);
            self.max[i] = self.max[i].max(p[i]);
        }
    }

    pub fn combine(&mut self, other: &BoundingBox) {
        if other.is_empty() {
            return;
        }
        self.expand(other.min);
        self.expand(other.max);
    }

    pub fn extent(&self) -> Vector3<f32> {
        Vector3::from(self.max) - Vector3::from(self.min)
    }

    pub fn corners(&self) -> [[f32; 3]; 8] {
        let (a, b) = (self.min, self.max);
        [
            [a[0], a[1], a[2]],
            [b[0], a[1], a[2]],
            [a[0], b[1], a[2]],
            [b[0], b[1], a[2]],
            [a[0], a[1], b[2]],
            [b[0], a[1], b[2]],
            [a[0], b[1], b[2]],
            [b[0], b[1], b[2]],
        ]
    }

    /// The box enclosing all eight corners after transforming them by `m`.
    pub fn transformed(&self, m: &Matrix4<f32>) -> BoundingBox {
        if self.is_empty() {
            return *self;
        }
        let corners = self.corners().map(|c| {
            let p = *m * Vector4::new(c[0], c[1], c[2], 1.0);
            [p.x, p.y, p.z]
        });
        BoundingBox::from_points(corners.iter())
    }
}

impl Default for BoundingBox {
    fn default() -> Self {
        Self::empty()
    }
}

/// The six clip planes and eight corners of a view-projection volume.
///
/// Planes follow the OpenGL clip convention (`-w <= z <= w`), which is what
/// `cgmath::perspective` produces. Planes point inwards and are not normalized.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Frustum {
    /// left, right, bottom, top, near, far
    pub planes: [Vector4<f32>; 6],
    /// World-space corners, `None` when the matrix is not invertible.
    pub corners: Option<[Vector3<f32>; 8]>,
}

impl Frustum {
    pub fn from_view_proj(view_proj: &Matrix4<f32>) -> Self {
        let mt = view_proj.transpose();
        let planes = [
            mt.w + mt.x,
            mt.w - mt.x,
            mt.w + mt.y,
            mt.w - mt.y,
            mt.w + mt.z,
            mt.w - mt.z,
        ];

        const NDC_CORNERS: [[f32; 3]; 8] = [
            [-1.0, -1.0, -1.0],
            [1.0, -1.0, -1.0],
            [1.0, 1.0, -1.0],
            [-1.0, 1.0, -1.0],
            [-1.0, -1.0, 1.0],
            [1.0, -1.0, 1.0],
            [1.0, 1.0, 1.0],
            [-1.0, 1.0, 1.0],
        ];
        let corners = view_proj.invert().map(|inv| {
            NDC_CORNERS.map(|c| {
                let q = inv * Vector4::new(c[0], c[1], c[2], 1.0);
                q.truncate() / q.w
            })
        });

        Self { planes, corners }
    }

    /// Conservative box test: rejects a box only if all its corners lie behind
    /// one plane, or if all frustum corners lie outside one of its faces.
    pub fn intersects_box(&self, bbox: &BoundingBox) -> bool {
        if bbox.is_empty() {
            return false;
        }
        let box_corners = bbox.corners();
        for plane in &self.planes {
            let outside = box_corners
                .iter()
                .filter(|c| plane.dot(Vector4::new(c[0], c[1], c[2], 1.0)) < 0.0)
                .count();
            if outside == box_corners.len() {
                return false;
            }
        }

        let Some(corners) = &self.corners else {
            return true;
        };
        for axis in 0..3 {
            if corners.iter().all(|c| c[axis] > bbox.max[axis]) {
                return false;
            }
            if corners.iter().all(|c| c[axis] < bbox.min[axis]) {
                return false;
            }
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cgmath::{Deg, Point3};

    fn camera_looking_down_negative_z() -> Frustum {
        let proj = cgmath::perspective(Deg(60.0), 1.0, 0.1, 100.0);
        let view = Matrix4::look_at_rh(
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(0.0, 0.0, -1.0),
            Vector3::unit_y(),
        );
        Frustum::from_view_proj(&(proj * view))
    }

    #[test]
    fn transformed_box_follows_translation() {
        let bbox = BoundingBox::new([-1.0; 3], [1.0; 3]);
        let moved = bbox.transformed(&Matrix4::from_translation(Vector3::new(10.0, 0.0, 0.0)));
        assert_eq!(moved.min, [9.0, -1.0, -1.0]);
        assert_eq!(moved.max, [11.0, 1.0, 1.0]);
    }

    #[test]
    fn rotated_box_grows_to_enclose_corners() {
        let bbox = BoundingBox::new([-1.0; 3], [1.0; 3]);
        let rotated = bbox.transformed(&Matrix4::from_angle_y(Deg(45.0)));
        let half_diagonal = 2.0_f32.sqrt();
        assert!((rotated.max[0] - half_diagonal).abs() < 1e-5);
        assert!((rotated.max[1] - 1.0).abs() < 1e-5);
    }

    #[test]
    fn empty_box_stays_empty() {
        let bbox = BoundingBox::empty();
        assert!(bbox.is_empty());
        assert!(bbox.transformed(&Matrix4::from_scale(2.0)).is_empty());
        assert!(!camera_looking_down_negative_z().intersects_box(&bbox));
    }

    #[test]
    fn box_in_front_of_camera_is_visible() {
        let frustum = camera_looking_down_negative_z();
        let bbox = BoundingBox::new([-1.0, -1.0, -11.0], [1.0, 1.0, -9.0]);
        assert!(frustum.intersects_box(&bbox));
    }

    #[test]
    fn box_behind_camera_is_culled() {
        let frustum = camera_looking_down_negative_z();
        let bbox = BoundingBox::new([-1.0, -1.0, 9.0], [1.0, 1.0, 11.0]);
        assert!(!frustum.intersects_box(&bbox));
    }

    #[test]
    fn box_straddling_a_plane_is_visible() {
        let frustum = camera_looking_down_negative_z();
        // crosses the far plane
        let bbox = BoundingBox::new([-1.0, -1.0, -150.0], [1.0, 1.0, -50.0]);
        assert!(frustum.intersects_box(&bbox));
        assert!(frustum.planes.iter().all(|p| p.magnitude() > 0.0));
    }
}
