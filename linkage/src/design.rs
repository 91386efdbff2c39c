//! Design file schema and its XML format.
//!
//! ```xml
//! <design author="" version="1.0" date="01/01/2024">
//!     <points>
//!         <point id="0" x="0" y="0"/>
//!     </points>
//!     <assemblies/>
//!     <links/>
//!     <bodies/>
//! </design>
//! ```
use crate::{
    Assembly, Body, Branch, Error, Gear, Guide, Joint, Link, Mechanism, Point, Result,
};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

fn one() -> f64 {
    1.
}

fn load_err(msg: impl std::fmt::Display) -> Error {
    Error::LoadFormat(msg.to_string())
}

/// Attributes of the `design` root, carried through [`load`] and [`save`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Header {
    /// Author
    pub author: String,
    /// Version
    pub version: String,
    /// Date
    pub date: String,
}

// The serde deserializer takes any root tag
fn check_root(s: &str) -> Result<()> {
    use quick_xml::events::Event;
    let mut reader = quick_xml::Reader::from_str(s);
    reader.trim_text(true);
    loop {
        match reader.read_event().map_err(load_err)? {
            Event::Start(e) | Event::Empty(e) => {
                return match e.name().as_ref() {
                    b"design" => Ok(()),
                    name => Err(load_err(format!(
                        "root element is <{}>, expect <design>",
                        String::from_utf8_lossy(name)
                    ))),
                };
            }
            Event::Eof => return Err(load_err("missing <design> root")),
            _ => (),
        }
    }
}

/// Root element of a design file.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(rename = "design")]
pub struct Design {
    /// Author
    #[serde(rename = "@author", default)]
    pub author: String,
    /// Version
    #[serde(rename = "@version", default)]
    pub version: String,
    /// Date
    #[serde(rename = "@date", default)]
    pub date: String,
    /// Joints
    #[serde(default)]
    pub points: Points,
    /// Gear assemblies
    #[serde(default)]
    pub assemblies: Assemblies,
    /// Links
    #[serde(default)]
    pub links: Links,
    /// Rigid bodies
    #[serde(default)]
    pub bodies: Bodies,
    /// Crank
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub driver: Option<DriverElem>,
}

/// List of `point` elements.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct Points {
    /// Points
    #[serde(rename = "point", default)]
    pub list: Vec<PointElem>,
}

/// A joint.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct PointElem {
    /// Index of the joint
    #[serde(rename = "@id")]
    pub id: usize,
    /// X coordinate
    #[serde(rename = "@x")]
    pub x: f64,
    /// Y coordinate
    #[serde(rename = "@y")]
    pub y: f64,
    /// Branch name, `near` if missing
    #[serde(rename = "@branch", default, skip_serializing_if = "Option::is_none")]
    pub branch: Option<String>,
}

/// List of `assembly` elements.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct Assemblies {
    /// Assemblies
    #[serde(rename = "assembly", default)]
    pub list: Vec<AssemblyElem>,
}

/// A gear assembly.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct AssemblyElem {
    /// Joint moved by the assembly
    #[serde(rename = "@end_effector")]
    pub end_effector: usize,
    /// Gears
    #[serde(rename = "gear", default)]
    pub gears: Vec<GearElem>,
    /// Gears feeding the links
    pub order: OrderElem,
    /// Link lengths
    #[serde(rename = "link", default)]
    pub links: Vec<LengthElem>,
}

/// A gear.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct GearElem {
    /// X coordinate of the center
    #[serde(rename = "@x")]
    pub x: f64,
    /// Y coordinate of the center
    #[serde(rename = "@y")]
    pub y: f64,
    /// Radius of the link end
    #[serde(rename = "@radius")]
    pub radius: f64,
    /// Initial phase
    #[serde(rename = "@phase", default)]
    pub phase: f64,
    /// Phase increment per driving step
    #[serde(rename = "@speed", default = "one")]
    pub speed: f64,
}

/// Indices into the gear list of an assembly.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct OrderElem {
    /// Gear of the first link
    #[serde(rename = "@id1")]
    pub id1: usize,
    /// Gear of the second link
    #[serde(rename = "@id2")]
    pub id2: usize,
}

/// A link length of an assembly.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct LengthElem {
    /// Length
    #[serde(rename = "@length")]
    pub length: f64,
}

/// List of `link` elements.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct Links {
    /// Links
    #[serde(rename = "link", default)]
    pub list: Vec<LinkElem>,
}

/// A link.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct LinkElem {
    /// Incoming slot of the end joint
    #[serde(rename = "@order")]
    pub order: u8,
    /// Start joint
    #[serde(rename = "@start")]
    pub start: usize,
    /// End joint
    #[serde(rename = "@end")]
    pub end: usize,
    /// Reference joint of the guide
    #[serde(rename = "@guide", default, skip_serializing_if = "Option::is_none")]
    pub guide: Option<usize>,
    /// Angle offset of the guide, fitted to the positions if missing
    #[serde(rename = "@angle", default, skip_serializing_if = "Option::is_none")]
    pub angle: Option<f64>,
}

/// List of `body` elements.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct Bodies {
    /// Bodies
    #[serde(rename = "body", default)]
    pub list: Vec<BodyElem>,
}

/// A rigid body.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct BodyElem {
    /// First pivot
    #[serde(rename = "@id1")]
    pub id1: usize,
    /// Second pivot
    #[serde(rename = "@id2")]
    pub id2: usize,
    /// Vertices in world coordinates
    #[serde(rename = "point", default)]
    pub points: Vec<XyElem>,
}

/// A vertex.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct XyElem {
    /// X coordinate
    #[serde(rename = "@x")]
    pub x: f64,
    /// Y coordinate
    #[serde(rename = "@y")]
    pub y: f64,
}

/// The crank.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct DriverElem {
    /// Pivot joint
    #[serde(rename = "@pivot")]
    pub pivot: usize,
    /// Driven joint
    #[serde(rename = "@tip")]
    pub tip: usize,
    /// Lower bound of the angle
    #[serde(rename = "@min", default, skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    /// Upper bound of the angle
    #[serde(rename = "@max", default, skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
}

impl Design {
    /// Parse from XML, the root element must be `design`.
    pub fn from_xml(s: &str) -> Result<Self> {
        check_root(s)?;
        quick_xml::de::from_str(s).map_err(load_err)
    }

    /// Write XML with four spaces of indentation.
    pub fn to_xml(&self) -> Result<String> {
        let mut s = String::new();
        let mut ser = quick_xml::se::Serializer::new(&mut s);
        ser.indent(' ', 4);
        self.serialize(ser).map_err(load_err)?;
        Ok(s)
    }

    /// Header attributes.
    pub fn header(&self) -> Header {
        let Self { author, version, date, .. } = self;
        Header { author: author.clone(), version: version.clone(), date: date.clone() }
    }

    /// Replace the header attributes.
    pub fn with_header(self, header: Header) -> Self {
        let Header { author, version, date } = header;
        Self { author, version, date, ..self }
    }

    /// Describe a mechanism, the header is left empty.
    pub fn from_mech(mech: &Mechanism) -> Result<Self> {
        let list = mech
            .joints
            .iter()
            .enumerate()
            .map(|(id, j)| PointElem {
                id,
                x: j.pos[0],
                y: j.pos[1],
                branch: (j.branch != Branch::Nearest).then(|| j.branch.to_string()),
            })
            .collect();
        let points = Points { list };
        let list = mech
            .assemblies
            .iter()
            .map(|a| AssemblyElem {
                end_effector: a.end_effector,
                gears: a
                    .gears
                    .iter()
                    .map(|g| GearElem {
                        x: g.center[0],
                        y: g.center[1],
                        radius: g.radius,
                        phase: g.phase,
                        speed: g.speed,
                    })
                    .collect(),
                order: OrderElem { id1: a.order[0], id2: a.order[1] },
                links: a.lens.iter().map(|&length| LengthElem { length }).collect(),
            })
            .collect();
        let assemblies = Assemblies { list };
        let list = mech
            .links
            .iter()
            .map(|l| LinkElem {
                order: l.slot,
                start: l.start,
                end: l.end,
                guide: l.guide.map(|g| g.from),
                angle: l.guide.map(|g| g.angle),
            })
            .collect();
        let links = Links { list };
        let list = mech
            .bodies
            .iter()
            .map(|b| {
                let points = b
                    .world_polygon(mech)?
                    .into_iter()
                    .map(|[x, y]| XyElem { x, y })
                    .collect();
                Ok(BodyElem { id1: b.pivots[0], id2: b.pivots[1], points })
            })
            .collect::<Result<_>>()?;
        let bodies = Bodies { list };
        let driver = mech.crank.as_ref().map(|c| DriverElem {
            pivot: c.pivot,
            tip: c.tip,
            min: c.range.map(|r| r[0]),
            max: c.range.map(|r| r[1]),
        });
        Ok(Self { points, assemblies, links, bodies, driver, ..Self::default() })
    }

    /// Build the mechanism at the stored positions.
    ///
    /// The topology is validated, the positions are not solved.
    pub fn to_mech(&self) -> Result<Mechanism> {
        let mut joints = vec![None; self.points.list.len()];
        for p in &self.points.list {
            let branch = match &p.branch {
                Some(name) => name
                    .parse()
                    .map_err(|_| load_err(format!("unknown branch {name:?} of point {}", p.id)))?,
                None => Branch::Nearest,
            };
            let slot = joints
                .get_mut(p.id)
                .ok_or_else(|| load_err(format!("point id {} is not contiguous", p.id)))?;
            if slot.is_some() {
                return Err(load_err(format!("duplicated point id {}", p.id)));
            }
            *slot = Some(Joint::with_branch([p.x, p.y], branch));
        }
        let mut mech = Mechanism::new();
        joints.into_iter().flatten().for_each(|j| {
            mech.add_joint(j);
        });
        let pos = |mech: &Mechanism, id| mech.pos(id).map_err(load_err);
        let mut slots = HashSet::new();
        for l in &self.links.list {
            let (slot, end) = (l.order, l.end);
            if slot > 1 {
                return Err(load_err(format!("link order {slot} of point {end} is not 0 or 1")));
            }
            if !slots.insert((end, slot)) {
                return Err(load_err(format!("slot {slot} of point {end} is taken twice")));
            }
            let (start, end) = (pos(&mech, l.start)?, pos(&mech, l.end)?);
            let guide = match (l.guide, l.angle) {
                (Some(from), Some(angle)) => Some(Guide { from, angle }),
                (Some(from), None) => Some(Guide::fit(from, start, end, pos(&mech, from)?)),
                (None, _) => None,
            };
            let link = Link { start: l.start, end: l.end, len: start.dist(&end), slot: l.order, guide };
            mech.push_link(link).map_err(load_err)?;
        }
        for a in &self.assemblies.list {
            let gears = a
                .gears
                .iter()
                .map(|g| Gear::new([g.x, g.y], g.radius).with_phase(g.phase).with_speed(g.speed))
                .collect();
            let lens = a.links.iter().map(|l| l.length).collect();
            let asm = Assembly::new(gears, [a.order.id1, a.order.id2], lens, a.end_effector);
            mech.add_assembly(asm).map_err(load_err)?;
        }
        for b in &self.bodies.list {
            let world = b.points.iter().map(|p| [p.x, p.y]).collect::<Vec<_>>();
            let body = Body::from_world(&mech, [b.id1, b.id2], &world).map_err(load_err)?;
            mech.add_body(body).map_err(load_err)?;
        }
        if let Some(d) = &self.driver {
            let range = match (d.min, d.max) {
                (Some(min), Some(max)) => Some([min, max]),
                (None, None) => None,
                _ => return Err(load_err("driver range needs both bounds")),
            };
            mech.set_crank(d.pivot, d.tip, range).map_err(load_err)?;
        }
        mech.check().map_err(load_err)?;
        Ok(mech)
    }
}

/// Load a mechanism and its header from XML.
pub fn load(s: &str) -> Result<(Header, Mechanism)> {
    let design = Design::from_xml(s)?;
    Ok((design.header(), design.to_mech()?))
}

/// Save a mechanism as XML under a header.
pub fn save(header: &Header, mech: &Mechanism) -> Result<String> {
    Design::from_mech(mech)?.with_header(header.clone()).to_xml()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    const DESIGN: &str = r#"<design author="someone" version="1.0" date="05/20/2015">
    <points>
        <point id="0" x="431" y="282"/>
        <point id="1" x="506" y="287"/>
        <point id="2" x="466" y="153"/>
        <point id="3" x="391" y="171" branch="left"/>
        <point id="4" x="340" y="120"/>
    </points>
    <assemblies>
        <assembly end_effector="2">
            <gear x="431" y="282" radius="29.45" phase="0.4"/>
            <gear x="506" y="287" radius="39.68" phase="3.3416" speed="-1"/>
            <order id1="0" id2="1"/>
            <link length="120"/>
            <link length="120"/>
            <link length="20"/>
        </assembly>
    </assemblies>
    <links>
        <link order="0" start="2" end="3"/>
        <link order="1" start="0" end="3"/>
        <link order="0" start="3" end="4" guide="2"/>
    </links>
    <bodies>
        <body id1="2" id2="3">
            <point x="466" y="153"/>
            <point x="391" y="171"/>
            <point x="420" y="190"/>
        </body>
    </bodies>
</design>"#;

    #[test]
    fn load_design() {
        let (header, m) = load(DESIGN).unwrap();
        assert_eq!(header.author, "someone");
        assert_eq!(header.date, "05/20/2015");
        assert_eq!(m.joints.len(), 5);
        assert_eq!(m.joints[3].branch, Branch::Side(crate::Side::Left));
        assert_eq!(m.assemblies[0].gears[1].speed, -1.);
        assert_eq!(m.assemblies[0].lens, [120., 120., 20.]);
        assert!(m.links[2].guide.is_some());
        // Stored positions are kept
        assert_eq!(m.joints[4].pos, [340., 120.]);
        let poly = m.body_polygon(0).unwrap();
        assert_abs_diff_eq!(poly[2][0], 420., epsilon = 1e-9);
        assert_abs_diff_eq!(poly[2][1], 190., epsilon = 1e-9);
    }

    #[test]
    fn round_trip() {
        let (header, m) = load(DESIGN).unwrap();
        let s = save(&header, &m).unwrap();
        let (header2, m2) = load(&s).unwrap();
        assert_eq!(header2, header);
        assert_eq!(header2.version, "1.0");
        assert_eq!(m2.links, m.links);
        // Compare the written elements
        let d = Design::from_xml(DESIGN).unwrap();
        let d2 = Design::from_xml(&s).unwrap();
        assert_eq!(d2.points, d.points);
        assert_eq!(d2.assemblies, d.assemblies);
        assert_eq!(d2.links.list.len(), d.links.list.len());
        for (a, b) in d.links.list.iter().zip(&d2.links.list) {
            assert_eq!((a.order, a.start, a.end, a.guide), (b.order, b.start, b.end, b.guide));
        }
        for (a, b) in d.bodies.list[0].points.iter().zip(&d2.bodies.list[0].points) {
            assert_abs_diff_eq!(a.x, b.x, epsilon = 1e-9);
            assert_abs_diff_eq!(a.y, b.y, epsilon = 1e-9);
        }
    }

    #[test]
    fn save_under_new_header() {
        let (_, m) = load(DESIGN).unwrap();
        let header = Header { author: "me".into(), version: "1.0".into(), date: "01/02/2024".into() };
        let s = save(&header, &m).unwrap();
        assert!(s.starts_with(r#"<design author="me" version="1.0" date="01/02/2024">"#));
        assert_eq!(load(&s).unwrap().0, header);
    }

    #[test]
    fn bad_files() {
        assert!(matches!(load("<design><points>"), Err(Error::LoadFormat(_))));
        let dup = r#"<design><points><point id="0" x="0" y="0"/><point id="0" x="1" y="0"/></points></design>"#;
        assert!(matches!(load(dup), Err(Error::LoadFormat(_))));
        let dangling = r#"<design><points><point id="0" x="0" y="0"/></points>
            <links><link order="0" start="0" end="3"/></links></design>"#;
        assert!(matches!(load(dangling), Err(Error::LoadFormat(_))));
        let single = r#"<design><points><point id="0" x="0" y="0"/><point id="1" x="1" y="0"/></points>
            <links><link order="0" start="0" end="1"/></links></design>"#;
        let e = load(single).unwrap_err();
        assert!(e.is_structural());
    }

    #[test]
    fn save_unplaced_body() {
        let (header, mut m) = load(DESIGN).unwrap();
        m.bodies[0].pivots[1] = 99;
        assert_eq!(save(&header, &m), Err(Error::UnknownPoint(99)));
    }

    #[test]
    fn wrong_root() {
        let s = r#"<notadesign><points><point id="0" x="0" y="0"/></points></notadesign>"#;
        assert!(matches!(load(s), Err(Error::LoadFormat(_))));
        assert!(matches!(Design::from_xml("<!-- empty -->"), Err(Error::LoadFormat(_))));
        // Leading declaration and comments are skipped
        let s = r#"<?xml version="1.0"?><!-- c --><design><points><point id="0" x="0" y="0"/></points></design>"#;
        assert_eq!(load(s).unwrap().1.joints.len(), 1);
    }

    #[test]
    fn bad_link_slots() {
        const POINTS: &str = r#"<points><point id="0" x="0" y="0"/><point id="1" x="100" y="0"/>
            <point id="2" x="50" y="60"/></points>"#;
        let order2 = format!(
            r#"<design>{POINTS}<links><link order="0" start="0" end="2"/>
            <link order="2" start="1" end="2"/></links></design>"#
        );
        let e = load(&order2).unwrap_err();
        assert!(matches!(&e, Error::LoadFormat(msg) if msg.contains("order 2")), "{e}");
        let taken = format!(
            r#"<design>{POINTS}<links><link order="0" start="0" end="2"/>
            <link order="0" start="1" end="2"/></links></design>"#
        );
        let e = load(&taken).unwrap_err();
        assert!(matches!(&e, Error::LoadFormat(msg) if msg.contains("taken twice")), "{e}");
        // The same pair with distinct slots is a dyad
        let dyad = format!(
            r#"<design>{POINTS}<links><link order="0" start="0" end="2"/>
            <link order="1" start="1" end="2"/></links></design>"#
        );
        assert_eq!(load(&dyad).unwrap().1.links.len(), 2);
    }
}
