// Mission options: the global settings record (date, time, map, weather).
//
// An Options item carries its scalar settings in the ordinary property bag
// plus two typed record lists that the block grammar writes as colon
// records: wind layers and country/coalition assignments. Those records are
// added through `Item::add_wind_layer` / `Item::add_country`.
//
// `Date` (`dd.mm.yyyy`) and `Time` (`h:m:s`) are required and are parsed
// with chrono at encode time; everything else has a default.
//
// Payload layout after the 60-byte header:
//   day u8 | month u8 | year u16 | hour u8 | minute u8 | second u8
//   7 x (len u32, bytes): HMap Textures Forests Layers GuiMap SeasonPrefix CloudConfig
//   CloudLevel i32 | CloudHeight i32 | PrecLevel i32 | PrecType i32
//   Turbulence f32 | TempPressLevel f32 | Temperature f32 | Pressure f32 | Haze f32
//   LayerFix u8 | SeaState u8
//   wind_count u32 | wind_count x (height f32, direction f32, speed f32)
//   country_count u32 | country_count x (country u16, coalition u16)

use chrono::{Datelike, NaiveDate, NaiveTime, Timelike};

use crate::encode::{f32_field, i32_field, u8_field};
use crate::error::{Result, ValueError};
use crate::item::Item;
use crate::props::PropKey;
use crate::wire::{ByteWriter, count_u32};

/// Fixed part of the options payload, excluding string bytes and records.
pub const OPTIONS_FIXED_LEN: usize = 81;

/// One wind layer: altitude in meters, direction in degrees, speed in m/s.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct WindLayer {
    pub height: f64,
    pub direction: f64,
    pub speed: f64,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CountryCoalition {
    pub country: u16,
    pub coalition: u16,
}

fn required_text<'a>(item: &'a Item, key: PropKey, name: &'static str) -> Result<&'a str> {
    item.text(&key)?.ok_or_else(|| {
        ValueError::Missing {
            kind: item.kind().tag().to_owned(),
            key: name,
        }
        .into()
    })
}

fn malformed(key: &'static str, text: &str, err: impl ToString) -> ValueError {
    ValueError::Malformed {
        key,
        text: text.to_owned(),
        reason: err.to_string(),
    }
}

fn parse_date(text: &str) -> Result<(u8, u8, u16)> {
    let date = NaiveDate::parse_from_str(text.trim(), "%d.%m.%Y")
        .map_err(|e| malformed("Date", text, e))?;
    let year = u16::try_from(date.year()).map_err(|e| malformed("Date", text, e))?;
    Ok((date.day() as u8, date.month() as u8, year))
}

fn parse_time(text: &str) -> Result<(u8, u8, u8)> {
    let time = NaiveTime::parse_from_str(text.trim(), "%H:%M:%S")
        .map_err(|e| malformed("Time", text, e))?;
    Ok((time.hour() as u8, time.minute() as u8, time.second() as u8))
}

pub(crate) fn options_payload(item: &Item) -> Result<Vec<u8>> {
    let (day, month, year) = parse_date(required_text(item, PropKey::Date, "Date")?)?;
    let (hour, minute, second) = parse_time(required_text(item, PropKey::Time, "Time")?)?;

    let mut w = ByteWriter::with_capacity(OPTIONS_FIXED_LEN);
    w.u8(day);
    w.u8(month);
    w.u16(year);
    w.u8(hour);
    w.u8(minute);
    w.u8(second);

    for key in [
        PropKey::HMap,
        PropKey::Textures,
        PropKey::Forests,
        PropKey::Layers,
        PropKey::GuiMap,
        PropKey::SeasonPrefix,
        PropKey::CloudConfig,
    ] {
        w.prefixed_str("options string", item.text(&key)?.unwrap_or(""))?;
    }

    w.i32(i32_field(item, &PropKey::CloudLevel, 0)?);
    w.i32(i32_field(item, &PropKey::CloudHeight, 0)?);
    w.i32(i32_field(item, &PropKey::PrecLevel, 0)?);
    w.i32(i32_field(item, &PropKey::PrecType, 0)?);
    w.f32(f32_field(item, &PropKey::Turbulence, 0.0)?);
    w.f32(f32_field(item, &PropKey::TempPressLevel, 0.0)?);
    w.f32(f32_field(item, &PropKey::Temperature, 0.0)?);
    w.f32(f32_field(item, &PropKey::Pressure, 0.0)?);
    w.f32(f32_field(item, &PropKey::Haze, 0.0)?);
    w.u8(u8_field(item, &PropKey::LayerFix, 0)?);
    w.u8(u8_field(item, &PropKey::SeaState, 0)?);

    let winds = item.wind_layers();
    w.u32(count_u32("wind layers", winds.len())?);
    for layer in winds {
        w.f32(layer.height as f32);
        w.f32(layer.direction as f32);
        w.f32(layer.speed as f32);
    }

    let countries = item.countries();
    w.u32(count_u32("countries", countries.len())?);
    for entry in countries {
        w.u16(entry.country);
        w.u16(entry.coalition);
    }
    Ok(w.into_inner())
}
