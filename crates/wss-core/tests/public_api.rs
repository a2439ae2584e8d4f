//! Exercises the crate surface the way an embedding service would:
//! build a grid, route channels through batch views, commit, inspect
//! the diff.

use async_trait::async_trait;
use wss_core::{Adapter, Axis, Channel, Field, FieldValue, FixedGridSpec, Grid, Result, Wss};

struct NullAdapter;

#[async_trait]
impl Adapter for NullAdapter {}

#[tokio::test]
async fn grid_assignment_always_sorts() {
    let channels = vec![
        Channel::new(194.5, 50.0),
        Channel::new(191.8, 50.0),
        Channel::new(193.2, 50.0),
        Channel::new(192.0, 50.0),
    ];
    let wss = Wss::new(Grid::new(channels), Some(Box::new(NullAdapter)))
        .await
        .unwrap();

    let centers: Vec<f64> = wss
        .grid()
        .iter()
        .map(Channel::central_frequency)
        .collect();
    assert!(centers.windows(2).all(|w| w[0] <= w[1]));
}

#[tokio::test]
async fn routing_workflow_round_trip() -> Result<()> {
    let grid = FixedGridSpec::default().build();
    let mut wss = Wss::new(grid, Some(Box::new(NullAdapter))).await?;

    // route the left half of a band to port 2, attenuated
    wss.grid_mut()
        .slice_mut(0..8)
        .set_all(Field::Port, 2u32.into())?;
    wss.grid_mut()
        .slice_mut(0..8)
        .set_all(Field::Attenuation, 3.0.into())?;
    wss.commit().await?;
    assert!(!wss.dirty());

    // a later edit shows up as an update keyed by the changed attribute
    wss.grid_mut().get_mut(0).unwrap().set_blocked(true)?;
    let delta = wss.changes();
    assert_eq!(delta.len(), 1);
    assert!(delta.updates_touch(&["blocked"]));
    assert!(!delta.has_inserts_or_deletes());

    Ok(())
}

#[tokio::test]
async fn filtered_subgrid_feeds_a_new_switch() -> Result<()> {
    let full = FixedGridSpec::default().build();
    let band = full.filter(Axis::Frequency, Some(192.0), Some(193.0), None);
    assert!(!band.is_empty());
    assert!(band.len() < full.len());

    let mut wss = Wss::new(band, Some(Box::new(NullAdapter))).await?;
    wss.commit().await?;

    // the committed snapshot is sealed; the working grid stays editable
    let snapshot = wss.previous_state().unwrap();
    assert!(snapshot.iter().all(Channel::is_frozen));
    wss.grid_mut().set_all(Field::Port, 9u32.into())?;
    assert!(wss.dirty());
    Ok(())
}

#[test]
fn batch_views_report_values_in_grid_order() {
    let mut grid = FixedGridSpec {
        number: 3,
        ..FixedGridSpec::default()
    }
    .build();
    grid.set_each(
        Field::Attenuation,
        &[1.0.into(), 2.0.into(), 3.0.into()],
    )
    .unwrap();

    assert_eq!(
        grid.values(Field::Attenuation),
        vec![
            FieldValue::Float(1.0),
            FieldValue::Float(2.0),
            FieldValue::Float(3.0)
        ]
    );

    let frequencies = grid.values(Field::CentralFrequency);
    match (&frequencies[0], &frequencies[2]) {
        (FieldValue::Float(a), FieldValue::Float(b)) => assert!(a < b),
        other => panic!("expected floats, got {other:?}"),
    }
}
