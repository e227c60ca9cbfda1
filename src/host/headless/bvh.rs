//! Minimal BVH reader: joint hierarchy, channel layout and per-frame channel values.

use crate::foundation::core::{DQuat, DVec3, Fps};
use crate::foundation::error::{BatchError, BatchResult};
use crate::foundation::math::axis_rotation_deg;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Channel {
    Position(char),
    Rotation(char),
}

impl Channel {
    fn parse(s: &str) -> BatchResult<Self> {
        let mut chars = s.chars();
        let axis = chars
            .next()
            .map(|c| c.to_ascii_uppercase())
            .filter(|c| matches!(c, 'X' | 'Y' | 'Z'))
            .ok_or_else(|| bvh_err(format!("unknown channel '{s}'")))?;
        match chars.as_str().to_ascii_lowercase().as_str() {
            "position" => Ok(Self::Position(axis)),
            "rotation" => Ok(Self::Rotation(axis)),
            _ => Err(bvh_err(format!("unknown channel '{s}'"))),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub(crate) struct BvhJoint {
    pub name: String,
    pub parent: Option<usize>,
    pub offset: DVec3,
    pub channels: Vec<Channel>,
    /// Index of this joint's first value within a frame row.
    pub first_value: usize,
}

#[derive(Clone, Debug, PartialEq)]
pub(crate) struct BvhClip {
    pub joints: Vec<BvhJoint>,
    pub fps: Fps,
    /// One row of channel values per frame.
    pub frames: Vec<Vec<f64>>,
}

impl BvhClip {
    /// Local translation and rotation of `joint` at `frame`.
    ///
    /// Joints with position channels take those as their local translation; others keep their
    /// offset.
    pub fn local_key(&self, joint: usize, frame: usize) -> Option<(DVec3, DQuat)> {
        let j = self.joints.get(joint)?;
        let row = self.frames.get(frame)?;
        let values = row.get(j.first_value..j.first_value + j.channels.len())?;

        let mut translation = j.offset;
        let has_position = j.channels.iter().any(|c| matches!(c, Channel::Position(_)));
        if has_position {
            translation = DVec3::ZERO;
        }
        let mut rotation = DQuat::IDENTITY;
        for (channel, v) in j.channels.iter().zip(values) {
            match *channel {
                Channel::Position('X') => translation.x = *v,
                Channel::Position('Y') => translation.y = *v,
                Channel::Position(_) => translation.z = *v,
                Channel::Rotation(axis) => {
                    rotation *= axis_rotation_deg(axis, *v).unwrap_or(DQuat::IDENTITY);
                }
            }
        }
        Some((translation, rotation))
    }
}

/// Largest frame count a clip header may declare.
const MAX_FRAMES: f64 = u32::MAX as f64;

fn bvh_err(msg: impl std::fmt::Display) -> BatchError {
    BatchError::serde(format!("bvh: {msg}"))
}

struct Tokens<'a> {
    inner: std::iter::Peekable<std::str::SplitWhitespace<'a>>,
}

impl<'a> Tokens<'a> {
    fn next(&mut self, what: &str) -> BatchResult<&'a str> {
        self.inner
            .next()
            .ok_or_else(|| bvh_err(format!("unexpected end of file, expected {what}")))
    }

    fn expect(&mut self, keyword: &str) -> BatchResult<()> {
        let t = self.next(keyword)?;
        if t.eq_ignore_ascii_case(keyword) {
            Ok(())
        } else {
            Err(bvh_err(format!("expected '{keyword}', found '{t}'")))
        }
    }

    fn number(&mut self, what: &str) -> BatchResult<f64> {
        let t = self.next(what)?;
        t.parse::<f64>()
            .map_err(|_| bvh_err(format!("expected {what}, found '{t}'")))
    }

    fn vec3(&mut self, what: &str) -> BatchResult<DVec3> {
        Ok(DVec3::new(
            self.number(what)?,
            self.number(what)?,
            self.number(what)?,
        ))
    }
}

pub(crate) fn parse(text: &str) -> BatchResult<BvhClip> {
    let mut t = Tokens {
        inner: text.split_whitespace().peekable(),
    };
    t.expect("HIERARCHY")?;
    t.expect("ROOT")?;

    let mut joints = Vec::new();
    let mut values_per_frame = 0usize;
    let root_name = t.next("root name")?.to_string();
    parse_joint(&mut t, root_name, None, &mut joints, &mut values_per_frame)?;

    t.expect("MOTION")?;
    t.expect("Frames:")?;
    let frame_count = t.number("frame count")?;
    if !(0.0..=MAX_FRAMES).contains(&frame_count) || frame_count.fract() != 0.0 {
        return Err(bvh_err(format!("invalid frame count {frame_count}")));
    }
    t.expect("Frame")?;
    t.expect("Time:")?;
    let fps = Fps::from_frame_time(t.number("frame time")?)?;

    // Rows are allocated as they are read, never from the header count.
    let mut frames = Vec::new();
    for _ in 0..frame_count as u64 {
        let mut row = Vec::with_capacity(values_per_frame);
        for _ in 0..values_per_frame {
            row.push(t.number("channel value")?);
        }
        frames.push(row);
    }

    Ok(BvhClip {
        joints,
        fps,
        frames,
    })
}

fn parse_joint(
    t: &mut Tokens<'_>,
    name: String,
    parent: Option<usize>,
    joints: &mut Vec<BvhJoint>,
    values_per_frame: &mut usize,
) -> BatchResult<()> {
    t.expect("{")?;
    t.expect("OFFSET")?;
    let offset = t.vec3("offset")?;
    t.expect("CHANNELS")?;
    let n = t.number("channel count")?;
    if !(0.0..=6.0).contains(&n) || n.fract() != 0.0 {
        return Err(bvh_err(format!("joint '{name}' has invalid channel count {n}")));
    }
    let mut channels = Vec::with_capacity(n as usize);
    for _ in 0..n as usize {
        channels.push(Channel::parse(t.next("channel")?)?);
    }

    let index = joints.len();
    joints.push(BvhJoint {
        name,
        parent,
        offset,
        first_value: *values_per_frame,
        channels,
    });
    *values_per_frame += n as usize;

    loop {
        match t.next("'JOINT', 'End' or '}'")? {
            "}" => return Ok(()),
            kw if kw.eq_ignore_ascii_case("JOINT") => {
                let child = t.next("joint name")?.to_string();
                parse_joint(t, child, Some(index), joints, values_per_frame)?;
            }
            kw if kw.eq_ignore_ascii_case("End") => {
                t.expect("Site")?;
                t.expect("{")?;
                t.expect("OFFSET")?;
                t.vec3("end site offset")?;
                t.expect("}")?;
            }
            other => return Err(bvh_err(format!("unexpected token '{other}'"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const WALK: &str = "HIERARCHY
ROOT Hips
{
  OFFSET 0.0 0.0 0.0
  CHANNELS 6 Xposition Yposition Zposition Zrotation Xrotation Yrotation
  JOINT LeftUpLeg
  {
    OFFSET 10.0 -5.0 0.0
    CHANNELS 3 Zrotation Xrotation Yrotation
    End Site
    {
      OFFSET 0.0 -40.0 0.0
    }
  }
}
MOTION
Frames: 2
Frame Time: 0.0333333
0 90 0 0 0 0 0 0 0
5 91 0 0 90 0 10 0 0
";

    #[test]
    fn parses_hierarchy_and_motion() {
        let clip = parse(WALK).unwrap();
        assert_eq!(clip.joints.len(), 2);
        assert_eq!(clip.joints[1].name, "LeftUpLeg");
        assert_eq!(clip.joints[1].parent, Some(0));
        assert_eq!(clip.joints[1].first_value, 6);
        assert_eq!(clip.fps, Fps::new(30, 1).unwrap());
        assert_eq!(clip.frames.len(), 2);
    }

    #[test]
    fn local_key_uses_position_channels_for_root() {
        let clip = parse(WALK).unwrap();
        let (t, r) = clip.local_key(0, 1).unwrap();
        assert_eq!(t, DVec3::new(5.0, 91.0, 0.0));
        // Zrotation 0, Xrotation 90, Yrotation 0.
        assert!((r * DVec3::Y - DVec3::Z).length() < 1e-9);

        let (t, _) = clip.local_key(1, 0).unwrap();
        assert_eq!(t, DVec3::new(10.0, -5.0, 0.0));
    }

    #[test]
    fn zero_frames_is_valid() {
        let text = WALK.replace("Frames: 2", "Frames: 0");
        let text = text.split("Frame Time: 0.0333333").next().unwrap().to_string()
            + "Frame Time: 0.0333333\n";
        let clip = parse(&text).unwrap();
        assert!(clip.frames.is_empty());
    }

    #[test]
    fn truncated_motion_is_an_error() {
        let text = WALK.trim_end().rsplit_once('\n').unwrap().0.to_string();
        let err = parse(&text).unwrap_err();
        assert!(err.to_string().contains("bvh:"));
    }

    #[test]
    fn bad_channel_is_an_error() {
        let text = WALK.replace(
            "Zrotation Xrotation Yrotation\n    End",
            "Wrotation Xrotation Yrotation\n    End",
        );
        assert!(parse(&text).is_err());
    }

    #[test]
    fn absurd_frame_count_is_an_error() {
        for count in ["1e300", "100000000000", "inf", "NaN", "-1", "2.5"] {
            let text = WALK.replace("Frames: 2", &format!("Frames: {count}"));
            let err = parse(&text).unwrap_err();
            assert!(err.to_string().contains("frame count"), "{count}: {err}");
        }
    }

    #[test]
    fn large_frame_count_without_rows_fails_on_missing_data() {
        let text = WALK.replace("Frames: 2", "Frames: 4000000000");
        let err = parse(&text).unwrap_err();
        assert!(err.to_string().contains("channel value"), "{err}");
    }
}
