//! Choosing a projection that suits a geographic extent.

use super::crs::Crs;

/// Area of the whole globe in square degrees
const GLOBE_AREA: f64 = 360.0 * 180.0;

/// Fraction of the latitude span trimmed from each end to place the Albers
/// standard parallels
const PARALLEL_INSET: f64 = 1.0 / 6.25;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shape {
    Landscape,
    Portrait,
    Square,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Size {
    Global,
    Large,
    Small,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LatitudeClass {
    NorthPolar,
    SouthPolar,
    Equatorial,
    MidLatitude,
}

/// Classifies a `[west, east, south, north]` extent and picks a projection
/// for it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CrsOptimiser {
    west: f64,
    east: f64,
    south: f64,
    north: f64,
}

impl CrsOptimiser {
    pub fn new(bbox: [f64; 4]) -> Self {
        let [west, east, south, north] = bbox;
        Self {
            west,
            east,
            south,
            north,
        }
    }

    pub fn min_lon(&self) -> f64 {
        self.west
    }

    /// The east edge, unwrapped past 360 for extents crossing the dateline.
    pub fn max_lon(&self) -> f64 {
        if self.east < self.west {
            self.east + 360.0
        } else {
            self.east
        }
    }

    pub fn min_lat(&self) -> f64 {
        self.south.min(self.north)
    }

    pub fn max_lat(&self) -> f64 {
        self.south.max(self.north)
    }

    pub fn central_lon(&self) -> f64 {
        (self.min_lon() + self.max_lon()) / 2.0
    }

    pub fn central_lat(&self) -> f64 {
        (self.min_lat() + self.max_lat()) / 2.0
    }

    pub fn width(&self) -> f64 {
        self.max_lon() - self.min_lon()
    }

    /// The latitude span; a single latitude means a cap reaching the pole.
    pub fn height(&self) -> f64 {
        if self.south == self.north {
            2.0 * (90.0 - self.north.abs())
        } else {
            self.max_lat() - self.min_lat()
        }
    }

    pub fn area(&self) -> f64 {
        self.width() * self.height()
    }

    pub fn ratio(&self) -> f64 {
        self.width() / self.height()
    }

    pub fn shape(&self) -> Shape {
        let ratio = self.ratio();
        if ratio > 1.2 {
            Shape::Landscape
        } else if ratio < 0.8 {
            Shape::Portrait
        } else {
            Shape::Square
        }
    }

    pub fn size(&self) -> Size {
        let fraction = self.area() / GLOBE_AREA;
        if fraction > 0.6 {
            Size::Global
        } else if fraction > 0.2 {
            Size::Large
        } else {
            Size::Small
        }
    }

    pub fn latitude_class(&self) -> LatitudeClass {
        if self.min_lat() > 60.0 {
            LatitudeClass::NorthPolar
        } else if self.max_lat() < -60.0 {
            LatitudeClass::SouthPolar
        } else if self.max_lat() < 50.0 && self.min_lat() > -50.0 {
            LatitudeClass::Equatorial
        } else {
            LatitudeClass::MidLatitude
        }
    }

    pub fn is_polar(&self) -> bool {
        matches!(
            self.latitude_class(),
            LatitudeClass::NorthPolar | LatitudeClass::SouthPolar
        )
    }

    pub fn is_equatorial(&self) -> bool {
        self.latitude_class() == LatitudeClass::Equatorial
    }

    pub fn standard_parallels(&self) -> (f64, f64) {
        let inset = self.height() * PARALLEL_INSET;
        (self.min_lat() + inset, self.max_lat() - inset)
    }

    /// The projection best suited to this extent.
    pub fn crs(&self) -> Crs {
        let central_lon = self.central_lon();

        if self.size() == Size::Global {
            return Crs::plate_carree(central_lon);
        }

        match self.latitude_class() {
            LatitudeClass::NorthPolar => {
                return Crs::NorthPolarStereo {
                    central_longitude: central_lon,
                }
            }
            LatitudeClass::SouthPolar => {
                return Crs::SouthPolarStereo {
                    central_longitude: central_lon,
                }
            }
            LatitudeClass::Equatorial => return Crs::plate_carree(central_lon),
            LatitudeClass::MidLatitude => {}
        }

        match self.shape() {
            Shape::Landscape => Crs::albers(
                central_lon,
                self.central_lat(),
                self.standard_parallels(),
            ),
            Shape::Square => Crs::lambert_azimuthal(central_lon, self.central_lat()),
            Shape::Portrait => Crs::transverse_mercator(central_lon, self.central_lat()),
        }
    }
}
