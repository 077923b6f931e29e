//! Plain-text rendering of a [`CityReport`].

use std::io::{self, Write};

use cityinfo_core::{CityReport, Pollutant, Section};

pub fn report<W: Write>(out: &mut W, report: &CityReport) -> io::Result<()> {
    city_details(out, report)?;
    summary(out, report)?;
    weather(out, report)?;
    air_quality(out, report)?;
    forecast(out, report)?;
    Ok(())
}

fn heading<W: Write>(out: &mut W, title: &str) -> io::Result<()> {
    writeln!(out)?;
    writeln!(out, "{title}")?;
    writeln!(out, "{}", "-".repeat(title.chars().count()))
}

/// Writes the inline error or "No data" line; returns true when the section has nothing else to show.
fn unavailable<W: Write>(out: &mut W, report: &CityReport, section: Section) -> io::Result<bool> {
    if !report.is_present(section) && depends_on_weather(section) && report.has_error(Section::Weather) {
        writeln!(out, "Unavailable without current weather")?;
        return Ok(true);
    }
    if let Some(err) = report.error(section) {
        writeln!(out, "Error: {}", err.message)?;
        return Ok(true);
    }
    if !report.is_present(section) {
        writeln!(out, "No data")?;
        return Ok(true);
    }
    Ok(false)
}

/// Sections that are never requested when current weather failed.
fn depends_on_weather(section: Section) -> bool {
    matches!(section, Section::AirQuality | Section::Forecast)
}

fn city_details<W: Write>(out: &mut W, report: &CityReport) -> io::Result<()> {
    heading(out, "City Details")?;
    if unavailable(out, report, Section::Geo)? {
        return Ok(());
    }
    let Some(geo) = &report.geo else { return Ok(()) };

    writeln!(out, "Name:       {}", geo.display_name())?;
    writeln!(out, "Country:    {}", geo.display_country())?;
    writeln!(out, "Population: {}", geo.display_population())?;
    writeln!(out, "Timezone:   {}", geo.display_timezone())?;
    writeln!(out, "Elevation:  {} meters", geo.display_elevation())
}

fn summary<W: Write>(out: &mut W, report: &CityReport) -> io::Result<()> {
    heading(out, &format!("Basic Information about {}", report.query))?;
    if unavailable(out, report, Section::Summary)? {
        return Ok(());
    }
    let Some(summary) = &report.summary else { return Ok(()) };

    writeln!(out, "{}", summary.description)
}

fn weather<W: Write>(out: &mut W, report: &CityReport) -> io::Result<()> {
    let title = match &report.weather {
        Some(w) if !w.country.is_empty() => format!("Weather in {}, {}", w.location, w.country),
        Some(w) => format!("Weather in {}", w.location),
        None => "Weather".to_string(),
    };
    heading(out, &title)?;
    if unavailable(out, report, Section::Weather)? {
        return Ok(());
    }
    let Some(w) = &report.weather else { return Ok(()) };

    writeln!(out, "Temperature: {} °F", w.temperature)?;
    writeln!(out, "Weather:     {}", w.display_condition())?;
    writeln!(out, "Humidity:    {}%", w.humidity)?;
    writeln!(out, "Wind Speed:  {} mph", w.display_wind_speed())?;
    writeln!(out, "Pressure:    {} hPa", w.pressure)?;
    writeln!(out, "Sunrise:     {}", w.display_sunrise())?;
    writeln!(out, "Sunset:      {}", w.display_sunset())?;
    writeln!(out, "Location:    {:.4}, {:.4}", w.coordinates.lat, w.coordinates.lon)?;
    writeln!(out, "Icon:        {}", w.icon_url())
}

fn air_quality<W: Write>(out: &mut W, report: &CityReport) -> io::Result<()> {
    heading(out, "Air Quality Components")?;
    if unavailable(out, report, Section::AirQuality)? {
        return Ok(());
    }
    let Some(air) = &report.air_quality else { return Ok(()) };

    writeln!(out, "Air Quality Index (AQI): {}", air.aqi)?;
    for (pollutant, value) in air.displayed() {
        writeln!(out, "{}: {} µg/m³", pollutant.label(), value)?;
    }

    heading(out, "Air Quality Definitions")?;
    for pollutant in Pollutant::DISPLAYED {
        writeln!(out, "{}: {}", pollutant.label(), pollutant.definition())?;
    }
    Ok(())
}

fn forecast<W: Write>(out: &mut W, report: &CityReport) -> io::Result<()> {
    let title = match &report.forecast {
        Some(f) => format!("5-Day Forecast for {}, {}", f.city, f.country),
        None => "5-Day Forecast".to_string(),
    };
    heading(out, &title)?;
    if unavailable(out, report, Section::Forecast)? {
        return Ok(());
    }
    let Some(series) = &report.forecast else { return Ok(()) };

    for entry in &series.entries {
        writeln!(
            out,
            "{}  {} °F  {}  {} hPa  {}%  {}",
            entry.display_time(),
            entry.temperature,
            entry.display_condition(),
            entry.pressure,
            entry.humidity,
            entry.icon_url(),
        )?;
    }
    for dropped in &series.dropped {
        writeln!(out, "Skipped entry '{}': {}", dropped.raw_timestamp, dropped.reason)?;
    }
    Ok(())
}
