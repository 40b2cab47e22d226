//! Handle ownership, composition and transform scenarios
//!
//! Covers copy and reference semantics, group editing, the split between the
//! current pose and permanent transforms, and margin validation.

use crate::error::GeometryError;
use crate::foundation::math::{Mat3, Vec3};
use crate::geometry::{Geometry3D, GeometryType, ShapeVariant};
use crate::scene::{GeometryRegistry, GeometryWorld};
use crate::shapes::{PointCloud, Primitive, TriangleMesh};
use approx::assert_relative_eq;
use nalgebra::{Rotation3, Vector3};

fn unit_triangle() -> TriangleMesh {
    TriangleMesh::from_flat(&[0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0], &[0, 1, 2]).unwrap()
}

fn tetrahedron() -> TriangleMesh {
    TriangleMesh::from_flat(
        &[0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0],
        &[0, 2, 1, 0, 1, 3, 0, 3, 2, 1, 2, 3],
    )
    .unwrap()
}

fn rotation(angle: f64) -> Mat3 {
    Rotation3::from_axis_angle(&Vector3::z_axis(), angle).into_inner()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deep_clone_then_set_is_equal_and_independent() {
        let mut original = Geometry3D::from(tetrahedron());
        original.set_collision_margin(0.25).unwrap();
        original.set_current_transform(rotation(0.4), Vec3::new(1.0, 2.0, 3.0));

        let mut copy = original.deep_clone();
        copy.set(&original);
        assert_eq!(copy, original);
        assert_eq!(ron::to_string(&copy).unwrap(), ron::to_string(&original).unwrap());

        copy.translate(&Vec3::new(5.0, 0.0, 0.0));
        copy.set_collision_margin(1.0).unwrap();
        assert_ne!(copy, original);
        assert_eq!(original.triangle_mesh().unwrap(), tetrahedron());
        assert_eq!(original.collision_margin(), 0.25);
    }

    #[test]
    fn test_default_handle_is_untyped_and_empty() {
        let g = Geometry3D::new();
        assert_eq!(g.geometry_type(), GeometryType::Untyped);
        assert_eq!(g.type_name(), "");
        assert!(g.is_empty());
        assert!(g.is_standalone());
        assert!(g.element_key().is_none());
        assert_eq!(g.collision_margin(), 0.0);
    }

    #[test]
    fn test_emptiness_follows_content() {
        assert!(!Geometry3D::from(Primitive::point(Vec3::zeros())).is_empty());
        assert!(Geometry3D::from(TriangleMesh::default()).is_empty());
        assert!(!Geometry3D::from(unit_triangle()).is_empty());
        assert!(Geometry3D::from(PointCloud::new()).is_empty());

        let mut group = Geometry3D::new();
        group.set_group().unwrap();
        assert!(group.is_empty());
        assert_eq!(group.type_name(), "Group");
    }

    #[test]
    fn test_typed_accessors_report_mismatch() {
        let g = Geometry3D::from(Primitive::sphere(Vec3::zeros(), 1.0));
        assert_eq!(g.type_name(), "Primitive");
        assert!(g.primitive().is_ok());
        assert!(matches!(g.triangle_mesh(), Err(GeometryError::TypeMismatch { .. })));
        assert!(matches!(g.point_cloud(), Err(GeometryError::TypeMismatch { .. })));
        assert!(matches!(g.num_elements(), Err(GeometryError::TypeMismatch { .. })));
        assert!(matches!(g.element(0), Err(GeometryError::TypeMismatch { .. })));
    }

    #[test]
    fn test_setters_replace_content() {
        let mut g = Geometry3D::from(Primitive::point(Vec3::zeros()));
        g.set_triangle_mesh(unit_triangle());
        assert_eq!(g.geometry_type(), GeometryType::TriangleMesh);
        g.set_point_cloud(PointCloud::from_points(vec![Vec3::x()]));
        assert_eq!(g.point_cloud().unwrap().num_points(), 1);
        g.set_primitive(Primitive::segment(Vec3::zeros(), Vec3::x()));
        assert_eq!(g.primitive().unwrap(), Primitive::segment(Vec3::zeros(), Vec3::x()));
    }

    #[test]
    fn test_free_resets_standalone_handle() {
        let mut g = Geometry3D::from(unit_triangle());
        g.set_collision_margin(0.5).unwrap();
        g.free().unwrap();
        assert_eq!(g.type_name(), "");
        assert_eq!(g.collision_margin(), 0.0);

        // Freeing an empty handle is harmless
        g.free().unwrap();
    }

    #[test]
    fn test_group_element_editing() {
        let mut group = Geometry3D::new();
        group.set_group().unwrap();
        assert_eq!(group.num_elements().unwrap(), 0);

        let mut member = Geometry3D::from(Primitive::sphere(Vec3::zeros(), 1.0));
        member.set_current_transform(Mat3::identity(), Vec3::new(0.0, 0.0, 4.0));
        group.set_element(0, &member).unwrap();
        group.set_element(1, &Geometry3D::from(unit_triangle())).unwrap();
        assert_eq!(group.num_elements().unwrap(), 2);
        assert!(!group.is_empty());

        assert_eq!(
            group.set_element(5, &member),
            Err(GeometryError::IndexOutOfRange { index: 5, len: 2 })
        );
        assert_eq!(group.num_elements().unwrap(), 2);
        assert!(matches!(group.element(2), Err(GeometryError::IndexOutOfRange { index: 2, len: 2 })));

        // Members are value copies with their own pose
        let first = group.element(0).unwrap();
        assert!(first.is_standalone());
        assert_eq!(first.current_transform().translation, Vec3::new(0.0, 0.0, 4.0));
        member.translate(&Vec3::new(9.0, 0.0, 0.0));
        assert_eq!(group.element(0).unwrap().primitive().unwrap(), Primitive::sphere(Vec3::zeros(), 1.0));

        group.set_element(0, &Geometry3D::from(Primitive::point(Vec3::zeros()))).unwrap();
        assert_eq!(group.element(0).unwrap().primitive().unwrap().kind().name(), "Point");
    }

    #[test]
    fn test_set_element_requires_group() {
        let mut g = Geometry3D::from(unit_triangle());
        let err = g.set_element(0, &Geometry3D::new()).unwrap_err();
        assert!(matches!(err, GeometryError::TypeMismatch { operation: "set_element", .. }));
        assert_eq!(g.triangle_mesh().unwrap(), unit_triangle());
    }

    #[test]
    fn test_current_transform_round_trips_without_touching_data() {
        let mut g = Geometry3D::from(tetrahedron());
        let r = rotation(1.1);
        let t = Vec3::new(-2.0, 0.5, 7.0);
        g.set_current_transform(r, t);

        let pose = g.current_transform();
        assert_eq!(pose.rotation, r);
        assert_eq!(pose.translation, t);
        assert_eq!(g.type_name(), "TriangleMesh");
        assert!(!g.is_empty());
        assert_eq!(g.triangle_mesh().unwrap(), tetrahedron());

        // Replaces, never composes
        g.set_current_transform(Mat3::identity(), Vec3::zeros());
        assert!(g.current_transform().is_identity());
    }

    #[test]
    fn test_non_rigid_pose_is_stored_as_given() {
        let mut g = Geometry3D::from(tetrahedron());
        g.set_current_transform(rotation(0.7), Vec3::new(1.0, 0.0, 0.0));
        assert!(g.current_transform().is_rigid());

        let scaled = Mat3::from_diagonal(&Vec3::new(2.0, 1.0, 1.0));
        g.set_current_transform(scaled, Vec3::zeros());
        let pose = g.current_transform();
        assert_eq!(pose.rotation, scaled);
        assert!(!pose.is_rigid());
    }

    #[test]
    fn test_permanent_transforms_rewrite_vertices() {
        let mut g = Geometry3D::from(unit_triangle());
        g.set_current_transform(rotation(0.3), Vec3::new(1.0, 0.0, 0.0));
        g.translate(&Vec3::new(0.0, 0.0, 1.0));
        g.scale_xyz(2.0, 3.0, 1.0);
        g.scale(0.5);

        let mesh = g.triangle_mesh().unwrap();
        assert_relative_eq!(mesh.vertices[1], Vec3::new(1.0, 0.0, 0.5), epsilon = 1e-12);
        assert_relative_eq!(mesh.vertices[2], Vec3::new(0.0, 1.5, 0.5), epsilon = 1e-12);
        assert_eq!(g.current_transform().translation, Vec3::new(1.0, 0.0, 0.0));

        g.rotate(&rotation(std::f64::consts::FRAC_PI_2));
        let mesh = g.triangle_mesh().unwrap();
        assert_relative_eq!(mesh.vertices[1], Vec3::new(0.0, 1.0, 0.5), epsilon = 1e-12);
    }

    #[test]
    fn test_nonuniform_scale_turns_sphere_into_ellipsoid() {
        let mut g = Geometry3D::from(Primitive::sphere(Vec3::zeros(), 1.0));
        g.scale(2.0);
        assert_eq!(g.primitive().unwrap(), Primitive::sphere(Vec3::zeros(), 2.0));
        g.scale_xyz(1.0, 2.0, 1.0);
        assert_eq!(g.primitive().unwrap().kind().name(), "Ellipsoid");
    }

    #[test]
    fn test_group_transform_recurses_through_member_poses() {
        let mut member = Geometry3D::from(Primitive::point(Vec3::new(1.0, 0.0, 0.0)));
        member.set_current_transform(rotation(std::f64::consts::FRAC_PI_2), Vec3::new(0.0, 0.0, 2.0));
        let mut group = Geometry3D::new();
        group.set_group().unwrap();
        group.set_element(0, &member).unwrap();

        group.translate(&Vec3::new(5.0, 0.0, 0.0));

        // World position of the point moves by exactly the translation
        let moved = group.element(0).unwrap();
        assert_eq!(moved.current_transform(), member.current_transform());
        let bb = group.bounding_box_tight();
        assert_relative_eq!(bb.min, Vec3::new(5.0, 1.0, 2.0), epsilon = 1e-12);
        assert_relative_eq!(bb.max, Vec3::new(5.0, 1.0, 2.0), epsilon = 1e-12);
    }

    #[test]
    fn test_margin_validation() {
        let mut g = Geometry3D::from(unit_triangle());
        assert_eq!(g.set_collision_margin(-0.1), Err(GeometryError::InvalidMargin(-0.1)));
        assert!(g.set_collision_margin(f64::NAN).is_err());
        assert_eq!(g.collision_margin(), 0.0);
        g.set_collision_margin(0.3).unwrap();
        assert_eq!(g.collision_margin(), 0.3);
        assert_eq!(g.triangle_mesh().unwrap(), unit_triangle());
    }

    #[test]
    fn test_reference_handles_alias_registry_state() {
        let mut world = GeometryWorld::new(3);
        let key = world.insert(&Geometry3D::from(unit_triangle()));

        let mut a = Geometry3D::reference(&world, key).unwrap();
        let b = Geometry3D::reference(&world, key).unwrap();
        assert!(!a.is_standalone());
        assert_eq!(a.element_key(), Some(key));

        a.translate(&Vec3::new(0.0, 0.0, 1.0));
        assert_eq!(b.triangle_mesh().unwrap().vertices[0], Vec3::new(0.0, 0.0, 1.0));

        // Clone aliases, deep_clone detaches
        let alias = b.clone();
        let detached = b.deep_clone();
        a.set_collision_margin(0.5).unwrap();
        assert_eq!(alias.collision_margin(), 0.5);
        assert_eq!(detached.collision_margin(), 0.0);
        assert!(detached.is_standalone());

        let shared = world.resolve(key).unwrap();
        assert_eq!(shared.borrow().margin(), 0.5);
    }

    #[test]
    fn test_reference_restrictions() {
        let mut world = GeometryWorld::new(0);
        let key = world.insert(&Geometry3D::from(Primitive::point(Vec3::zeros())));
        let mut r = Geometry3D::reference(&world, key).unwrap();

        assert!(matches!(r.set_group(), Err(GeometryError::TypeMismatch { operation: "set_group", .. })));
        assert!(matches!(r.free(), Err(GeometryError::TypeMismatch { operation: "free", .. })));
        assert_eq!(r.type_name(), "Primitive");

        let missing = crate::scene::ElementKey::new(0, 99);
        assert_eq!(
            Geometry3D::reference(&world, missing).unwrap_err(),
            GeometryError::UnresolvedReference(missing)
        );
    }

    #[test]
    fn test_set_from_alias_of_itself() {
        let mut world = GeometryWorld::new(0);
        let key = world.insert(&Geometry3D::from(unit_triangle()));
        let mut a = Geometry3D::reference(&world, key).unwrap();
        let b = a.clone();
        a.set(&b);
        assert_eq!(a.triangle_mesh().unwrap(), unit_triangle());
    }

    #[test]
    fn test_group_serializes_with_member_state() {
        let mut member = Geometry3D::from(Primitive::sphere(Vec3::zeros(), 0.5));
        member.set_collision_margin(0.1).unwrap();
        member.set_current_transform(Mat3::identity(), Vec3::new(1.0, 2.0, 3.0));
        let mut group = Geometry3D::new();
        group.set_group().unwrap();
        group.set_element(0, &member).unwrap();

        let shape = group.shape().unwrap();
        let text = ron::to_string(&shape).unwrap();
        let restored: ShapeVariant = ron::from_str(&text).unwrap();
        assert_eq!(restored, shape);
    }

    #[test]
    fn test_join_mismatch_leaves_handles_unchanged() {
        let mut labelled = PointCloud::from_points(vec![Vec3::zeros()]);
        labelled.add_property("label").unwrap();
        let a = Geometry3D::from(labelled);
        let mut b = Geometry3D::from(PointCloud::from_points(vec![Vec3::x(), Vec3::y()]));

        let mut cloud = b.point_cloud().unwrap();
        let err = cloud.join(&a.point_cloud().unwrap()).unwrap_err();
        assert!(matches!(err, GeometryError::DimensionMismatch { .. }));
        b.set_point_cloud(cloud);

        assert_eq!(b.point_cloud().unwrap().num_points(), 2);
        assert_eq!(a.point_cloud().unwrap().property_names(), &["label".to_string()]);
    }
}
