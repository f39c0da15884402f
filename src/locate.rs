use crate::types::{EnrichedRegion, LngLat, Region, RegionId};
use geo::bounding_rect::BoundingRect;
use geo::coordinate_position::{CoordPos, CoordinatePosition};
use geo::{Coord, MultiPolygon};
use rstar::{RTree, RTreeObject, AABB};

/// Anything with an identifier and an areal boundary can be located.
pub trait Located {
    fn region_id(&self) -> &RegionId;
    fn boundary(&self) -> &MultiPolygon<f64>;
}

impl Located for Region {
    fn region_id(&self) -> &RegionId {
        &self.id
    }
    fn boundary(&self) -> &MultiPolygon<f64> {
        &self.geometry
    }
}

impl Located for EnrichedRegion {
    fn region_id(&self) -> &RegionId {
        &self.id
    }
    fn boundary(&self) -> &MultiPolygon<f64> {
        &self.geometry
    }
}

/// Boundary points count as inside.
fn covers(geometry: &MultiPolygon<f64>, coord: &Coord<f64>) -> bool {
    geometry.coordinate_position(coord) != CoordPos::Outside
}

/// Linear scan; the first region in iteration order that covers the point wins.
pub fn locate<'a, T: Located>(point: LngLat, regions: &'a [T]) -> Option<&'a RegionId> {
    let coord = Coord { x: point.lng, y: point.lat };
    regions
        .iter()
        .find(|r| covers(r.boundary(), &coord))
        .map(|r| r.region_id())
}

struct AreaIndex {
    index: usize,
    aabb: AABB<[f64; 2]>,
}

impl RTreeObject for AreaIndex {
    type Envelope = AABB<[f64; 2]>;
    fn envelope(&self) -> Self::Envelope {
        self.aabb
    }
}

/// Bounding-box index over a region slice. Candidates are tested in
/// ascending position, so results match [`locate`] exactly.
pub struct RegionIndex {
    tree: RTree<AreaIndex>,
}

impl RegionIndex {
    pub fn build<T: Located>(regions: &[T]) -> Self {
        let items = regions
            .iter()
            .enumerate()
            .filter_map(|(i, region)| {
                let rect = region.boundary().bounding_rect()?;
                Some(AreaIndex {
                    index: i,
                    aabb: AABB::from_corners([rect.min().x, rect.min().y], [rect.max().x, rect.max().y]),
                })
            })
            .collect();

        RegionIndex {
            tree: RTree::bulk_load(items),
        }
    }

    /// Returns the matching region itself, so regions sharing an identifier
    /// stay distinct. `regions` must be the slice the index was built from.
    pub fn locate<'a, T: Located>(&self, point: LngLat, regions: &'a [T]) -> Option<&'a T> {
        let coord = Coord { x: point.lng, y: point.lat };
        let envelope = AABB::from_point([point.lng, point.lat]);

        let mut candidates: Vec<usize> = self
            .tree
            .locate_in_envelope_intersecting(&envelope)
            .map(|c| c.index)
            .collect();
        candidates.sort_unstable();

        candidates
            .into_iter()
            .filter_map(|i| regions.get(i))
            .find(|r| covers(r.boundary(), &coord))
    }

    pub fn len(&self) -> usize {
        self.tree.size()
    }
}
