use uuid::Uuid;

use super::*;

#[test]
fn error_code_variants() {
    let cases = [
        (EraseError::EmptyStroke { points: 1 }, "E_EMPTY_STROKE"),
        (EraseError::NonInvertible { det: 0.0 }, "E_NON_INVERTIBLE"),
        (EraseError::ObjectNotFound(Uuid::nil()), "E_OBJECT_NOT_FOUND"),
        (EraseError::SurfaceAlloc { width: 0, height: 0 }, "E_SURFACE_ALLOC"),
        (EraseError::Render("x".into()), "E_RENDER"),
        (EraseError::Config("x".into()), "E_CONFIG"),
        (EraseError::Projection("x".into()), "E_PROJECTION"),
    ];
    for (err, code) in cases {
        assert_eq!(err.error_code(), code, "{err}");
    }
}

#[test]
fn messages_carry_context() {
    assert_eq!(
        EraseError::EmptyStroke { points: 1 }.to_string(),
        "empty stroke: 1 point(s) after decimation"
    );
    assert_eq!(EraseError::SurfaceAlloc { width: 3, height: 0 }.to_string(), "surface allocation failed: 3x0");
    let id = Uuid::nil();
    assert!(EraseError::ObjectNotFound(id).to_string().ends_with(&id.to_string()));
}
