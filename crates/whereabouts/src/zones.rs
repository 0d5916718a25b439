//! Zone resolution: manual geofences first, discovered clusters second.

use rstar::{RTree, RTreeObject, AABB};
use serde::{Deserialize, Serialize};

use crate::geo::EARTH_RADIUS_M;
use crate::types::{GeoPoint, Place};

/// Zone name returned when a point matches no geofence and no cluster.
pub const UNKNOWN_ZONE: &str = "unknown";

/// Default neighbourhood radius for clustering, in meters.
pub const DEFAULT_CLUSTER_RADIUS_M: f64 = 3.0;

/// A cluster discovered by [`ZoneModel::fit`]. Ids are only meaningful
/// within the fit that produced them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AutoCluster {
    pub id: usize,
    pub centroid: GeoPoint,
    pub size: usize,
}

impl AutoCluster {
    pub fn name(&self) -> String {
        format!("cluster_{}", self.id)
    }
}

/// Manual geofences plus an automatically fitted cluster set.
#[derive(Debug, Clone)]
pub struct ZoneModel {
    places: Vec<Place>,
    clusters: Vec<AutoCluster>,
    cluster_radius_m: f64,
}

impl ZoneModel {
    pub fn new(places: Vec<Place>, cluster_radius_m: f64) -> Self {
        Self {
            places,
            clusters: Vec::new(),
            cluster_radius_m,
        }
    }

    /// Append a geofence. Names are not de-duplicated; the earliest wins on lookup.
    pub fn define_zone(&mut self, place: Place) {
        self.places.push(place);
    }

    pub fn places(&self) -> &[Place] {
        &self.places
    }

    pub fn clusters(&self) -> &[AutoCluster] {
        &self.clusters
    }

    pub fn cluster_radius_m(&self) -> f64 {
        self.cluster_radius_m
    }

    /// Rebuild the cluster set from scratch. Empty input keeps the current set.
    pub fn fit(&mut self, points: &[GeoPoint]) {
        if points.is_empty() {
            return;
        }
        self.clusters = cluster_points(points, self.cluster_radius_m);
        tracing::debug!(
            "Fitted {} clusters from {} points",
            self.clusters.len(),
            points.len()
        );
    }

    /// Resolve a point to a zone name.
    pub fn assign(&self, point: &GeoPoint) -> String {
        if let Some(place) = self.places.iter().find(|p| p.contains(point)) {
            return place.name.clone();
        }
        self.nearest_cluster(point)
            .map(AutoCluster::name)
            .unwrap_or_else(|| UNKNOWN_ZONE.to_string())
    }

    /// Closest cluster within the clustering radius; ties go to the earliest.
    fn nearest_cluster(&self, point: &GeoPoint) -> Option<&AutoCluster> {
        let mut best: Option<(&AutoCluster, f64)> = None;
        for cluster in &self.clusters {
            let dist = cluster.centroid.distance_to(point);
            if best.map_or(true, |(_, d)| dist < d) {
                best = Some((cluster, dist));
            }
        }
        best.filter(|(_, d)| *d <= self.cluster_radius_m)
            .map(|(c, _)| c)
    }
}

/// A point in the clustering index, keyed by its position in the input.
struct IndexedPoint {
    index: usize,
    lon: f64,
    lat: f64,
}

impl RTreeObject for IndexedPoint {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        AABB::from_point([self.lon, self.lat])
    }
}

/// Degree boxes around `p` covering every point within `eps_m`. Longitude
/// extents that cross the antimeridian are split in two.
fn search_envelopes(p: &GeoPoint, eps_m: f64) -> Vec<AABB<[f64; 2]>> {
    let dlat = (eps_m / EARTH_RADIUS_M).to_degrees() * 1.01;
    let (lat_lo, lat_hi) = ((p.lat - dlat).max(-90.0), (p.lat + dlat).min(90.0));

    // Widest parallel in the box, doubled since the geodesic cuts across it.
    let cos_lat = lat_lo.abs().max(lat_hi.abs()).to_radians().cos();
    let dlon = 2.0 * dlat / cos_lat;
    if !dlon.is_finite() || dlon >= 180.0 {
        return vec![AABB::from_corners([-180.0, lat_lo], [180.0, lat_hi])];
    }

    let (lon_lo, lon_hi) = (p.lon - dlon, p.lon + dlon);
    let mut boxes = vec![AABB::from_corners([lon_lo, lat_lo], [lon_hi, lat_hi])];
    if lon_lo < -180.0 {
        boxes.push(AABB::from_corners([lon_lo + 360.0, lat_lo], [180.0, lat_hi]));
    }
    if lon_hi > 180.0 {
        boxes.push(AABB::from_corners([-180.0, lat_lo], [lon_hi - 360.0, lat_hi]));
    }
    boxes
}

/// Density clustering with `min_samples = 1`: every point is a core point, so
/// clusters are the connected components of the "within `eps_m`" graph.
/// Cluster ids follow the position of each cluster's first point.
fn cluster_points(points: &[GeoPoint], eps_m: f64) -> Vec<AutoCluster> {
    let tree = RTree::bulk_load(
        points
            .iter()
            .enumerate()
            .map(|(index, p)| IndexedPoint {
                index,
                lon: p.lon,
                lat: p.lat,
            })
            .collect(),
    );

    let mut membership: Vec<Option<usize>> = vec![None; points.len()];
    let mut clusters = Vec::new();
    let mut frontier = Vec::new();

    for seed in 0..points.len() {
        if membership[seed].is_some() {
            continue;
        }
        let id = clusters.len();
        membership[seed] = Some(id);
        frontier.push(seed);

        let (mut sum_lat, mut sum_lon, mut size) = (0.0, 0.0, 0usize);
        while let Some(i) = frontier.pop() {
            sum_lat += points[i].lat;
            sum_lon += points[i].lon;
            size += 1;
            for envelope in search_envelopes(&points[i], eps_m) {
                for candidate in tree.locate_in_envelope(&envelope) {
                    let j = candidate.index;
                    if membership[j].is_none() && points[i].distance_to(&points[j]) <= eps_m {
                        membership[j] = Some(id);
                        frontier.push(j);
                    }
                }
            }
        }

        // Planar mean; fine at the tens-of-meters radii this targets.
        clusters.push(AutoCluster {
            id,
            centroid: GeoPoint::new(sum_lat / size as f64, sum_lon / size as f64),
            size,
        });
    }

    clusters
}
