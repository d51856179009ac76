//! Rewrites traffic light phase durations in a SUMO network file.

use crate::config::TrafficLightPlan;
use crate::error::{Error, Result};
use log::info;
use quick_xml::events::{BytesStart, Event};
use quick_xml::{Reader, Writer};
use std::collections::HashMap;
use std::path::Path;

/// Fixed duration of every odd-numbered phase, in seconds. Those are
/// the clearance phases between green phases and are never retimed.
const TRANSITION_PHASE_SECS: f64 = 2.0;

/// Interleaves green durations with the fixed transition phases,
/// producing one full schedule per light.
///
/// `durations` supplies the even-numbered phases of each light in
/// configuration order; there must be exactly one entry per even phase
/// across all the lights.
pub fn expand_durations(
    plans: &[TrafficLightPlan],
    durations: &[f64],
) -> Result<HashMap<String, Vec<f64>>> {
    let expected = plans.iter().map(|plan| (plan.phases + 1) / 2).sum();
    if durations.len() != expected {
        return Err(Error::PhaseCount {
            expected,
            got: durations.len(),
        });
    }

    let mut schedules = HashMap::new();
    let mut offset = 0;
    for plan in plans {
        let mut schedule = Vec::with_capacity(plan.phases);
        for phase in 0..plan.phases {
            if phase % 2 == 0 {
                schedule.push(durations[offset]);
                offset += 1;
            } else {
                schedule.push(TRANSITION_PHASE_SECS);
            }
        }
        schedules.insert(plan.id.clone(), schedule);
    }
    Ok(schedules)
}

/// Applies new durations to the `tlLogic` phases of a network document,
/// leaving everything else byte for byte as it was.
///
/// Lights absent from `schedules` keep their phases; phases beyond the
/// end of a schedule are also kept.
pub fn rewrite_network(xml: &str, schedules: &HashMap<String, Vec<f64>>) -> Result<Vec<u8>> {
    let mut reader = Reader::from_str(xml);
    let mut writer = Writer::new(Vec::new());
    let mut current: Option<std::slice::Iter<f64>> = None;

    loop {
        match reader.read_event()? {
            Event::Start(elem) if elem.name().as_ref() == b"tlLogic" => {
                current = tl_id(&elem)?
                    .and_then(|id| schedules.get(&id))
                    .map(|schedule| schedule.iter());
                writer.write_event(Event::Start(elem))?;
            }
            Event::End(elem) if elem.name().as_ref() == b"tlLogic" => {
                current = None;
                writer.write_event(Event::End(elem))?;
            }
            Event::Empty(elem) if elem.name().as_ref() == b"phase" => {
                let elem = match current.as_mut().and_then(|schedule| schedule.next()) {
                    Some(duration) => set_duration(&elem, *duration)?,
                    None => elem,
                };
                writer.write_event(Event::Empty(elem))?;
            }
            Event::Eof => break,
            event => writer.write_event(event)?,
        }
    }

    Ok(writer.into_inner())
}

/// Retimes the network file in place.
pub fn retime_network_file(
    path: impl AsRef<Path>,
    plans: &[TrafficLightPlan],
    durations: &[f64],
) -> Result<()> {
    let schedules = expand_durations(plans, durations)?;
    let xml = std::fs::read_to_string(&path)?;
    let updated = rewrite_network(&xml, &schedules)?;
    std::fs::write(&path, updated)?;
    info!(
        "retimed {} traffic light programs in {}",
        schedules.len(),
        path.as_ref().display()
    );
    Ok(())
}

/// Reads the id attribute of a `tlLogic` element.
fn tl_id(elem: &BytesStart) -> Result<Option<String>> {
    for attr in elem.attributes() {
        let attr = attr.map_err(quick_xml::Error::from)?;
        if attr.key.as_ref() == b"id" {
            let value = attr.unescape_value().map_err(quick_xml::Error::from)?;
            return Ok(Some(value.into_owned()));
        }
    }
    Ok(None)
}

/// Returns a copy of a phase element with its duration replaced.
fn set_duration(elem: &BytesStart, duration: f64) -> Result<BytesStart<'static>> {
    let mut updated = BytesStart::new("phase");
    for attr in elem.attributes() {
        let attr = attr.map_err(quick_xml::Error::from)?;
        if attr.key.as_ref() == b"duration" {
            updated.push_attribute(("duration", duration.to_string().as_str()));
        } else {
            updated.push_attribute(attr);
        }
    }
    Ok(updated)
}

#[cfg(test)]
mod test {
    use super::*;

    fn plan(id: &str, phases: usize) -> TrafficLightPlan {
        TrafficLightPlan {
            id: id.to_string(),
            phases,
        }
    }

    #[test]
    fn interleaves_green_and_transition_phases() {
        let plans = [plan("a", 4), plan("b", 6)];
        let schedules =
            expand_durations(&plans, &[10.0, 20.0, 30.0, 40.0, 50.0]).unwrap();

        assert_eq!(schedules["a"], vec![10.0, 2.0, 20.0, 2.0]);
        assert_eq!(schedules["b"], vec![30.0, 2.0, 40.0, 2.0, 50.0, 2.0]);
    }

    #[test]
    fn rejects_a_short_duration_list() {
        let plans = [plan("a", 4), plan("b", 6)];
        let result = expand_durations(&plans, &[10.0, 20.0, 30.0]);
        assert!(matches!(
            result,
            Err(Error::PhaseCount {
                expected: 5,
                got: 3
            })
        ));
    }

    const NET: &str = "\
<?xml version=\"1.0\" encoding=\"UTF-8\"?>
<net version=\"1.16\">
    <tlLogic id=\"a\" type=\"static\" programID=\"0\" offset=\"0\">
        <phase duration=\"31\" state=\"GGgrr\"/>
        <phase duration=\"4\" state=\"yygrr\"/>
    </tlLogic>
    <tlLogic id=\"c\" type=\"static\" programID=\"0\" offset=\"0\">
        <phase duration=\"31\" state=\"rrGGg\"/>
    </tlLogic>
    <edge id=\"e1\"/>
</net>";

    #[test]
    fn rewrites_only_the_scheduled_lights() {
        let schedules = HashMap::from([("a".to_string(), vec![28.0, 2.0])]);
        let updated = rewrite_network(NET, &schedules).unwrap();
        let updated = String::from_utf8(updated).unwrap();

        assert!(updated.contains("<phase duration=\"28\" state=\"GGgrr\"/>"));
        assert!(updated.contains("<phase duration=\"2\" state=\"yygrr\"/>"));
        // The unscheduled light and the rest of the file are untouched.
        assert!(updated.contains("<phase duration=\"31\" state=\"rrGGg\"/>"));
        assert!(updated.contains("<edge id=\"e1\"/>"));
        assert!(updated.starts_with("<?xml version=\"1.0\" encoding=\"UTF-8\"?>"));
    }

    #[test]
    fn a_short_schedule_leaves_trailing_phases_alone() {
        let schedules = HashMap::from([("a".to_string(), vec![28.0])]);
        let updated = rewrite_network(NET, &schedules).unwrap();
        let updated = String::from_utf8(updated).unwrap();

        assert!(updated.contains("<phase duration=\"28\" state=\"GGgrr\"/>"));
        assert!(updated.contains("<phase duration=\"4\" state=\"yygrr\"/>"));
    }

    #[test]
    fn whole_documents_round_trip_unchanged_without_schedules() {
        let schedules = HashMap::new();
        let updated = rewrite_network(NET, &schedules).unwrap();
        assert_eq!(String::from_utf8(updated).unwrap(), NET);
    }
}
