//! DAW-style workflow: arrange clips on tracks, share a pattern, render the engine snapshot

use timeline_automation::persist;
use timeline_automation::prelude::*;

fn main() {
    println!("DAW Workflow\n");

    let mut arrangement = Arrangement::new(&Config::default());
    let keys = arrangement.add_track("Keys");

    arrange_clips(&mut arrangement, keys);
    track_automation(&mut arrangement, keys);
    render_snapshot(&arrangement);
    save_clip(&arrangement, keys);
}

/// Lay out a riff, then reuse it through its pattern.
fn arrange_clips(arrangement: &mut Arrangement, track: TrackId) {
    println!("1. Arranging Clips\n");

    let pattern = PatternId::new();
    let Some(riff) = arrangement.create_clip(track, 0.0) else {
        return;
    };
    arrangement.update_clip(riff, |clip| {
        clip.clone()
            .with_pattern(Some(pattern))
            .add_note(Note::new(60, 100, 0.0, 1.0))
            .add_note(Note::new(64, 90, 1.0, 1.0))
            .add_note(Note::new(67, 90, 2.0, 2.0))
    });

    // same notes, second half of the bar first
    if let Some(copy) = arrangement.duplicate_clip(riff, 4.0) {
        arrangement.update_clip(copy, |clip| clip.clone().with_content_offset(2.0));
    }

    // edits on one pattern clip reach the other
    arrangement.update_clip(riff, |clip| clip.add_note(Note::new(72, 80, 3.5, 0.5)));

    for clip in arrangement.pattern_clips(pattern) {
        let pitches: Vec<u8> = clip.note_onsets().iter().map(|onset| onset.pitch).collect();
        println!("   clip at beat {:>4.1}: {:?}", clip.timeline_start(), pitches);
    }
    println!();
}

fn track_automation(arrangement: &mut Arrangement, track: TrackId) {
    println!("2. Track Automation\n");

    arrangement.update_track_lane(track, Parameter::Volume, |lane| {
        lane.add_point(ControlPoint::new(0.0, 0.0))
            .add_point(ControlPoint::new(4.0, 0.70))
            .add_point(ControlPoint::new(8.0, 0.70))
    });
    arrangement.update_track_lane(track, Parameter::Pan, |lane| {
        lane.add_point(ControlPoint::new(0.0, -1.0))
            .add_point(ControlPoint::new(8.0, 1.0))
    });

    if let Some(track) = arrangement.track(track) {
        for beat in [0.0, 2.0, 4.0, 6.0] {
            println!(
                "   beat {beat}: volume {:.2}, pan {:+.2}",
                track.value_at(Parameter::Volume, beat),
                track.value_at(Parameter::Pan, beat)
            );
        }
    }
    println!();
}

fn render_snapshot(arrangement: &Arrangement) {
    println!("3. Engine Snapshot (revision {})\n", arrangement.revision());

    let snapshot = arrangement.snapshot();
    for track in &snapshot.tracks {
        println!("   volume: {:?}", track.volume);
        println!("   pan:    {:?}", track.pan);
        for clip in &track.clips {
            println!("   clip {:.1}s..{:.1}s", clip.start_seconds, clip.end_seconds);
        }
    }
    println!();
}

fn save_clip(arrangement: &Arrangement, track: TrackId) {
    println!("4. Persistence\n");

    let Some(clip) = arrangement.track(track).and_then(|track| track.clips().first()) else {
        return;
    };
    match persist::clip_to_json(clip) {
        Ok(json) => println!("{json}"),
        Err(err) => eprintln!("   failed to store clip: {err}"),
    }
}
