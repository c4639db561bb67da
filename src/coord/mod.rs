// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Sky coordinates, tangent-plane projections and pixel grids.
//!
//! All angles here are in degrees. Tangent-plane offsets are gnomonic
//! projections about a reference position, with the first offset increasing
//! towards the east (increasing right ascension).


use chrono::{Datelike, NaiveDateTime, Timelike};
use hifitime::{Duration, Epoch};
use marlu::{precession::get_lmst, LatLngHeight};

use crate::{
    constants::{LMT_HEIGHT_M, LMT_LAT_DEG, LMT_LONG_DEG},
    io::write::FitsHeader,
};

/// A right ascension and declination \[degrees\].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RADec {
    pub ra: f64,
    pub dec: f64,
}

impl RADec {
    pub fn new(ra: f64, dec: f64) -> RADec {
        RADec { ra, dec }
    }
}

/// Project a tangent-plane offset `(x, y)` about `origin` onto the sky.
pub fn offset_to_lonlat(x: f64, y: f64, origin: RADec) -> RADec {
    let xi = x.to_radians();
    let eta = y.to_radians();
    let (s_dec0, c_dec0) = origin.dec.to_radians().sin_cos();
    let denom = c_dec0 - eta * s_dec0;
    let ra = origin.ra + xi.atan2(denom).to_degrees();
    let dec = (s_dec0 + eta * c_dec0)
        .atan2((xi * xi + denom * denom).sqrt())
        .to_degrees();
    RADec {
        ra: ra.rem_euclid(360.0),
        dec,
    }
}

/// The inverse of [`offset_to_lonlat`]. Returns `(x, y)` \[degrees\].
pub fn lonlat_to_offset(pos: RADec, origin: RADec) -> (f64, f64) {
    let (s_dec0, c_dec0) = origin.dec.to_radians().sin_cos();
    let (s_dec, c_dec) = pos.dec.to_radians().sin_cos();
    let (s_dra, c_dra) = (pos.ra - origin.ra).to_radians().sin_cos();
    let cos_c = s_dec0 * s_dec + c_dec0 * c_dec * c_dra;
    let xi = c_dec * s_dra / cos_c;
    let eta = (c_dec0 * s_dec - s_dec0 * c_dec * c_dra) / cos_c;
    (xi.to_degrees(), eta.to_degrees())
}

/// A longitude/latitude rectangle on the sky \[degrees\]. Longitudes are
/// unwrapped, so `lon_max` may exceed 360.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SkyBoundingBox {
    pub lon_min: f64,
    pub lon_max: f64,
    pub lat_min: f64,
    pub lat_max: f64,
}

impl SkyBoundingBox {
    /// The bounding box of a set of positions. Longitudes are unwrapped about
    /// the first position so that boxes straddling RA = 0 stay small. Returns
    /// `None` if there are no positions.
    pub fn from_lonlat(lon: &[f64], lat: &[f64]) -> Option<SkyBoundingBox> {
        let lon0 = *lon.first()?;
        let mut bbox = SkyBoundingBox {
            lon_min: f64::INFINITY,
            lon_max: f64::NEG_INFINITY,
            lat_min: f64::INFINITY,
            lat_max: f64::NEG_INFINITY,
        };
        for (&l, &b) in lon.iter().zip(lat.iter()) {
            let l = lon0 + (l - lon0 + 180.0).rem_euclid(360.0) - 180.0;
            bbox.lon_min = bbox.lon_min.min(l);
            bbox.lon_max = bbox.lon_max.max(l);
            bbox.lat_min = bbox.lat_min.min(b);
            bbox.lat_max = bbox.lat_max.max(b);
        }
        Some(bbox)
    }

    pub fn center(&self) -> RADec {
        RADec {
            ra: (0.5 * (self.lon_min + self.lon_max)).rem_euclid(360.0),
            dec: 0.5 * (self.lat_min + self.lat_max),
        }
    }

    /// The on-sky width, measured along the central latitude.
    pub fn width(&self) -> f64 {
        (self.lon_max - self.lon_min) * self.center().dec.to_radians().cos()
    }

    pub fn height(&self) -> f64 {
        self.lat_max - self.lat_min
    }

    /// Grow the box by `dx` (on-sky) and `dy` on each side.
    pub fn pad_with(&self, dx: f64, dy: f64) -> SkyBoundingBox {
        let c_lat = self.center().dec.to_radians().cos().max(1e-6);
        SkyBoundingBox {
            lon_min: self.lon_min - dx / c_lat,
            lon_max: self.lon_max + dx / c_lat,
            lat_min: (self.lat_min - dy).max(-90.0),
            lat_max: (self.lat_max + dy).min(90.0),
        }
    }
}

/// A gnomonic (TAN) world coordinate system for a 2D image with shape
/// `(ny, nx)`. Pixel coordinates are 0-based, and pixel `(x, y)` covers
/// `[x - 0.5, x + 0.5)` by `[y - 0.5, y + 0.5)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Wcs {
    /// The reference sky position.
    pub crval: RADec,
    /// The 0-based pixel position of `crval`, `(x, y)`.
    pub crpix: (f64, f64),
    /// The pixel size \[degrees\]. The x axis increases westwards.
    pub pixscale: f64,
    /// `(ny, nx)`.
    pub shape: (usize, usize),
}

impl Wcs {
    /// A grid centred on `center` with `nx` by `ny` pixels.
    pub fn new(center: RADec, pixscale: f64, nx: usize, ny: usize) -> Wcs {
        Wcs {
            crval: center,
            crpix: ((nx as f64 - 1.0) / 2.0, (ny as f64 - 1.0) / 2.0),
            pixscale,
            shape: (ny, nx),
        }
    }

    /// Make a grid covering `bbox`. The pixel size starts at `pixscale`, and is
    /// increased in steps of `pixscale * adaptive_pixscale_factor` until the
    /// grid has no more than `n_pix_max` pixels.
    pub fn covering(
        bbox: &SkyBoundingBox,
        pixscale: f64,
        adaptive_pixscale_factor: f64,
        n_pix_max: usize,
    ) -> Wcs {
        let grid_size = |p: f64| {
            // Don't add a pixel for rounding error.
            let nx = (bbox.width() / p - 1e-9).ceil().max(1.0) as usize;
            let ny = (bbox.height() / p - 1e-9).ceil().max(1.0) as usize;
            (nx, ny)
        };
        let step = pixscale * adaptive_pixscale_factor;
        let mut p = pixscale;
        let (mut nx, mut ny) = grid_size(p);
        while nx * ny > n_pix_max.max(1) && step > 0.0 {
            p += step;
            (nx, ny) = grid_size(p);
        }
        Wcs::new(bbox.center(), p, nx, ny)
    }

    pub fn nx(&self) -> usize {
        self.shape.1
    }

    pub fn ny(&self) -> usize {
        self.shape.0
    }

    /// The fractional pixel coordinates `(x, y)` of a sky position.
    pub fn world_to_pixel(&self, pos: RADec) -> (f64, f64) {
        let (xi, eta) = lonlat_to_offset(pos, self.crval);
        self.offset_to_pixel(xi, eta)
    }

    pub fn pixel_to_world(&self, x: f64, y: f64) -> RADec {
        let (xi, eta) = self.pixel_to_offset(x, y);
        offset_to_lonlat(xi, eta, self.crval)
    }

    /// Tangent-plane offsets (relative to `crval`) to pixel coordinates.
    pub fn offset_to_pixel(&self, xi: f64, eta: f64) -> (f64, f64) {
        (
            self.crpix.0 - xi / self.pixscale,
            self.crpix.1 + eta / self.pixscale,
        )
    }

    pub fn pixel_to_offset(&self, x: f64, y: f64) -> (f64, f64) {
        (
            (self.crpix.0 - x) * self.pixscale,
            (y - self.crpix.1) * self.pixscale,
        )
    }

    /// The index `(iy, ix)` of the pixel containing a pixel coordinate, if it
    /// is inside the grid.
    pub fn bin(&self, x: f64, y: f64) -> Option<(usize, usize)> {
        let ix = x.round();
        let iy = y.round();
        if ix < 0.0 || iy < 0.0 || ix >= self.nx() as f64 || iy >= self.ny() as f64 {
            return None;
        }
        Some((iy as usize, ix as usize))
    }

    /// The solid angle of a pixel \[square degrees\].
    pub fn pixel_area(&self) -> f64 {
        self.pixscale * self.pixscale
    }

    /// FITS WCS header cards for this grid.
    pub(crate) fn fits_header(&self) -> FitsHeader {
        let mut header = FitsHeader::default();
        header.push_str("CTYPE1", "RA---TAN");
        header.push_str("CTYPE2", "DEC--TAN");
        header.push_str("CUNIT1", "deg");
        header.push_str("CUNIT2", "deg");
        header.push_str("RADESYS", "ICRS");
        // FITS pixels are 1-based.
        header.push_float("CRPIX1", self.crpix.0 + 1.0);
        header.push_float("CRPIX2", self.crpix.1 + 1.0);
        header.push_float("CRVAL1", self.crval.ra);
        header.push_float("CRVAL2", self.crval.dec);
        header.push_float("CDELT1", -self.pixscale);
        header.push_float("CDELT2", self.pixscale);
        header
    }
}

/// The position of the LMT on the Earth.
pub fn lmt_location() -> LatLngHeight {
    LatLngHeight {
        longitude_rad: LMT_LONG_DEG.to_radians(),
        latitude_rad: LMT_LAT_DEG.to_radians(),
        height_metres: LMT_HEIGHT_M,
    }
}

/// Convert a UTC time into a [`hifitime::Epoch`].
pub fn utc_epoch(t: NaiveDateTime) -> Epoch {
    Epoch::from_gregorian_utc(
        t.year(),
        t.month() as u8,
        t.day() as u8,
        t.hour() as u8,
        t.minute() as u8,
        t.second() as u8,
        t.nanosecond(),
    )
}

/// The altitude \[degrees\] of `pos` as seen from the LMT at time `t`.
/// Precession and refraction are ignored; DUT1 is taken to be zero.
pub fn lmt_altitude(pos: RADec, t: NaiveDateTime) -> f64 {
    let location = lmt_location();
    let lst = get_lmst(location.longitude_rad, utc_epoch(t), Duration::default());
    marlu::RADec::from_degrees(pos.ra, pos.dec)
        .to_hadec(lst)
        .to_azel(location.latitude_rad)
        .el
        .to_degrees()
}
