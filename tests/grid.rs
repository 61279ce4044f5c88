use inkcloud::error::LayoutError;
use inkcloud::grid::Grid;

#[test]
fn from_cells_validates_length() {
    assert!(Grid::from_cells(4, 3, vec![0; 12]).is_ok());
    let err = Grid::from_cells(4, 3, vec![0; 11]).unwrap_err();
    assert!(matches!(
        err,
        LayoutError::MaskDimensionMismatch {
            len: 11,
            width: 4,
            height: 3
        }
    ));
}

#[test]
fn set_and_count() {
    let mut g = Grid::new(5, 5);
    assert_eq!(g.count_set(), 0);
    g.set(2, 3);
    g.set(2, 3);
    g.set(4, 4);
    assert!(g.is_set(2, 3));
    assert!(!g.is_set(3, 2));
    assert_eq!(g.count_set(), 2);
    // Out-of-range writes are ignored, reads are unset.
    g.set(5, 0);
    assert!(!g.is_set(5, 0));
    assert_eq!(g.count_set(), 2);
}

#[test]
fn snapshot_is_independent() {
    let mut g = Grid::new(3, 3);
    g.set(1, 1);
    let snap = g.snapshot();
    g.set(0, 0);
    assert_eq!(snap.count_set(), 1, "snapshot must not alias the original");
    assert_eq!(g.count_set(), 2);
}

#[test]
fn merge_ors_cells() {
    let mut a = Grid::new(3, 2);
    a.set(0, 0);
    let mut b = Grid::new(3, 2);
    b.set(2, 1);
    b.set(0, 0);
    a.merge(&b).unwrap();
    assert!(a.is_set(0, 0));
    assert!(a.is_set(2, 1));
    assert_eq!(a.count_set(), 2);
}

#[test]
fn merge_rejects_dimension_mismatch() {
    let mut a = Grid::new(3, 2);
    let b = Grid::new(2, 3);
    assert!(matches!(
        a.merge(&b),
        Err(LayoutError::MaskDimensionMismatch { .. })
    ));
}
