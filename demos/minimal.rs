//! Minimal example showing the essential features

use timeline_automation::prelude::*;
use timeline_automation::{curve, snapshot};

fn main() {
    println!("Timeline Automation - Essential Features\n");

    // 1. Lanes with edge hold
    basic_lane();

    // 2. Volume curve
    volume_curve();

    // 3. Looping clips
    looping_clip();

    // 4. Splitting
    split();
}

fn basic_lane() {
    println!("1. Basic Lane\n");

    let lane = TrackLane::new(TrackId::new(), Parameter::Volume)
        .with_point(ControlPoint::new(1.0, 0.2))
        .with_point(ControlPoint::new(5.0, 0.8));

    println!("   t=0: {:.2} (held)", lane.value_at(0.0));
    println!("   t=3: {:.2}", lane.value_at(3.0));
    println!("   t=9: {:.2} (held)\n", lane.value_at(9.0));
}

fn volume_curve() {
    println!("2. Volume Curve\n");

    for normalized in [0.0, 0.01, 0.35, 0.70, 0.85, 1.0] {
        println!("   {:.2} -> {:6.1} dB", normalized, curve::to_db(normalized));
    }
    println!();
}

fn looping_clip() {
    println!("3. Looping Clip\n");

    let clip = MidiClip::new(TrackId::new(), 0.0, 12.0)
        .with_loop_length(4.0)
        .add_note(Note::new(60, 100, 1.0, 0.5));

    println!("   note at content beat 1 sounds at {:?}", clip.arrangement_times_for(1.0));

    let offset = clip.clone().with_content_offset(2.0);
    let starts: Vec<f64> = offset.note_onsets().iter().map(|onset| onset.start).collect();
    println!("   with a 2 beat offset: {:?}\n", starts);
}

fn split() {
    println!("4. Splitting\n");

    let clip = MidiClip::new(TrackId::new(), 4.0, 4.0)
        .add_automation_point(Parameter::Volume, ControlPoint::new(0.0, 0.2))
        .add_automation_point(Parameter::Volume, ControlPoint::new(4.0, 0.8));

    if let Some((left, right)) = clip.split(2.0).into_pair() {
        let tempo = Tempo::default();
        println!("   left:  {}", snapshot::clip_automation(&left, Parameter::Volume, tempo));
        println!("   right: {}", snapshot::clip_automation(&right, Parameter::Volume, tempo));
    }
}
