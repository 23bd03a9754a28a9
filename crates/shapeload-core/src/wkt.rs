//! Minimal WKT1 reader for `.prj` sidecars.
//!
//! Definitions carrying a top-level `AUTHORITY`/`ID` clause are resolved by
//! code. Everything else, including the ESRI dialect most `.prj` files are
//! written in, is converted element by element into a PROJ.4 string.

use log::debug;
use thiserror::Error;

/// Reasons a WKT definition could not be read or converted.
#[derive(Debug, Error, PartialEq)]
pub enum WktError {
    /// The text is not well-formed WKT
    #[error("Malformed WKT at byte {position}: {message}")]
    Syntax {
        /// Byte offset of the offending character
        position: usize,
        /// What was expected there
        message: String,
    },

    /// The WKT is well-formed but describes something without a PROJ.4 mapping
    #[error("Unsupported WKT: {what}")]
    Unsupported {
        /// The unsupported element
        what: String,
    },
}

/// What a WKT definition resolves to.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum WktCrs {
    /// A CRS identified by EPSG code
    Epsg(u32),
    /// A CRS spelled out as a PROJ.4 string
    Proj4(String),
}

#[derive(Debug, Clone, PartialEq)]
enum Value {
    Text(String),
    Number(f64),
    Word(String),
    Node(Node),
}

#[derive(Debug, Clone, PartialEq)]
struct Node {
    keyword: String,
    values: Vec<Value>,
}

impl Node {
    fn name(&self) -> Option<&str> {
        self.values.iter().find_map(|value| match value {
            Value::Text(text) => Some(text.as_str()),
            _ => None,
        })
    }

    fn numbers(&self) -> impl Iterator<Item = f64> + '_ {
        self.values.iter().filter_map(|value| match value {
            Value::Number(number) => Some(*number),
            _ => None,
        })
    }

    fn number(&self, index: usize) -> Option<f64> {
        self.numbers().nth(index)
    }

    fn children<'a>(&'a self, keyword: &'a str) -> impl Iterator<Item = &'a Node> + 'a {
        self.values.iter().filter_map(move |value| match value {
            Value::Node(node) if node.keyword == keyword => Some(node),
            _ => None,
        })
    }

    fn child<'a>(&'a self, keyword: &'a str) -> Option<&'a Node> {
        self.children(keyword).next()
    }
}

/// A parsed WKT definition.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Wkt {
    root: Node,
}

impl Wkt {
    /// Returns `true` if `text` looks like WKT rather than free text.
    pub(crate) fn is_candidate(text: &str) -> bool {
        text.starts_with(|c: char| c.is_ascii_alphabetic()) && text.contains(['[', '('])
    }

    pub(crate) fn parse(text: &str) -> Result<Self, WktError> {
        let mut parser = Parser { text, position: 0 };
        let root = parser.node()?;
        parser.skip_whitespace();
        if parser.position < text.len() {
            return Err(parser.error("end of definition"));
        }
        Ok(Self { root })
    }

    /// EPSG code of the outermost element's `AUTHORITY` or `ID` clause.
    ///
    /// Clauses of nested elements never count, so the `GEOGCS` authority inside
    /// a `PROJCS` is not mistaken for the projected system's own.
    pub(crate) fn authority_code(&self) -> Option<u32> {
        ["AUTHORITY", "ID"]
            .iter()
            .filter_map(|keyword| self.root.child(keyword))
            .find(|clause| clause.name().is_some_and(|a| a.eq_ignore_ascii_case("EPSG")))
            .and_then(|clause| {
                clause.number(0).map(|code| code as u32).or_else(|| {
                    clause
                        .values
                        .iter()
                        .filter_map(|value| match value {
                            Value::Text(text) => text.trim().parse().ok(),
                            _ => None,
                        })
                        .next()
                })
            })
    }

    /// Converts the definition element by element.
    pub(crate) fn to_crs(&self) -> Result<WktCrs, WktError> {
        match self.root.keyword.as_str() {
            "GEOGCS" => Ok(WktCrs::Proj4(geographic(&self.root)?)),
            "PROJCS" => projected(&self.root),
            other => Err(WktError::Unsupported {
                what: format!("{other} definitions"),
            }),
        }
    }
}

fn geographic(geogcs: &Node) -> Result<String, WktError> {
    let mut parts = vec!["+proj=longlat".to_string()];
    parts.extend(datum_parameters(geogcs)?);
    parts.push("+no_defs".to_string());
    Ok(parts.join(" "))
}

fn projected(projcs: &Node) -> Result<WktCrs, WktError> {
    let geogcs = projcs.child("GEOGCS").ok_or_else(|| missing("GEOGCS"))?;
    let name = projcs
        .child("PROJECTION")
        .and_then(Node::name)
        .ok_or_else(|| missing("PROJECTION"))?;

    let method = match Method::from_name(&normalize(name)) {
        Some(Method::WebMercator) => return Ok(WktCrs::Epsg(3857)),
        Some(method) => method,
        None => {
            return Err(WktError::Unsupported {
                what: format!("projection method '{name}'"),
            });
        },
    };

    let to_meter = projcs.child("UNIT").and_then(|unit| unit.number(0)).unwrap_or(1.0);
    let mut parts = vec![format!("+proj={}", method.proj())];
    let mut true_scale = None;

    for parameter in projcs.children("PARAMETER") {
        let (Some(name), Some(value)) = (parameter.name(), parameter.number(0)) else {
            continue;
        };
        match method.parameter(&normalize(name)) {
            Some(Parameter::Linear(key)) => parts.push(format!("+{key}={}", value * to_meter)),
            Some(Parameter::Plain("lat_ts")) => {
                true_scale = Some(value);
                parts.push(format!("+lat_ts={value}"));
            },
            Some(Parameter::Plain(key)) => parts.push(format!("+{key}={value}")),
            None => debug!("Ignoring WKT parameter '{name}' for {}", method.proj()),
        }
    }

    if let Method::PolarStereographic { north } = method {
        let north = north.unwrap_or_else(|| true_scale.is_none_or(|lat| lat >= 0.0));
        parts.push(format!("+lat_0={}", if north { 90 } else { -90 }));
    }

    parts.extend(datum_parameters(geogcs)?);
    if (to_meter - 1.0).abs() < 1e-12 {
        parts.push("+units=m".to_string());
    } else {
        parts.push(format!("+to_meter={to_meter}"));
    }
    parts.push("+no_defs".to_string());
    Ok(WktCrs::Proj4(parts.join(" ")))
}

/// Ellipsoid, datum shift and prime meridian of a `GEOGCS`.
fn datum_parameters(geogcs: &Node) -> Result<Vec<String>, WktError> {
    let datum = geogcs.child("DATUM").ok_or_else(|| missing("DATUM"))?;
    let datum_name = normalize(datum.name().unwrap_or_default());
    let datum_name = datum_name
        .strip_prefix('d')
        .filter(|_| is_esri_datum(datum))
        .unwrap_or(datum_name.as_str());
    let mut parameters = Vec::new();

    if matches!(datum_name, "wgs1984" | "wgs84" | "worldgeodeticsystem1984") {
        parameters.push("+datum=WGS84".to_string());
    } else {
        let spheroid = datum
            .child("SPHEROID")
            .or_else(|| datum.child("ELLIPSOID"))
            .ok_or_else(|| missing("SPHEROID"))?;
        parameters.push(ellipsoid(spheroid)?);

        if let Some(towgs84) = datum.child("TOWGS84") {
            let shift: Vec<String> = towgs84.numbers().map(|n| n.to_string()).collect();
            parameters.push(format!("+towgs84={}", shift.join(",")));
        } else if matches!(datum_name, "northamerican1983" | "northamericandatum1983" | "nad83") {
            parameters.push("+towgs84=0,0,0,0,0,0,0".to_string());
        }
    }

    let meridian = geogcs.child("PRIMEM").and_then(|pm| pm.number(0));
    if let Some(meridian) = meridian.filter(|lon| *lon != 0.0) {
        parameters.push(format!("+pm={meridian}"));
    }
    Ok(parameters)
}

/// ESRI prefixes datum names with `D_`.
fn is_esri_datum(datum: &Node) -> bool {
    datum
        .name()
        .is_some_and(|name| name.len() > 2 && name[..2].eq_ignore_ascii_case("d_"))
}

fn ellipsoid(spheroid: &Node) -> Result<String, WktError> {
    let known = match normalize(spheroid.name().unwrap_or_default()).as_str() {
        "grs1980" | "grs80" => Some("GRS80"),
        "wgs1984" | "wgs84" => Some("WGS84"),
        "wgs1972" | "wgs72" => Some("WGS72"),
        "clarke1866" => Some("clrk66"),
        "clarke1880rgs" | "clarke1880" => Some("clrk80"),
        "international1924" | "international1909" => Some("intl"),
        "bessel1841" => Some("bessel"),
        "krasovsky1940" | "krassowsky1940" => Some("krass"),
        "airy1830" => Some("airy"),
        _ => None,
    };
    if let Some(ellps) = known {
        return Ok(format!("+ellps={ellps}"));
    }

    let semi_major = spheroid.number(0).ok_or_else(|| missing("SPHEROID semi-major axis"))?;
    match spheroid.number(1) {
        Some(rf) if rf != 0.0 => Ok(format!("+a={semi_major} +rf={rf}")),
        _ => Ok(format!("+a={semi_major} +b={semi_major}")),
    }
}

fn missing(element: &str) -> WktError {
    WktError::Unsupported {
        what: format!("definition has no {element}"),
    }
}

/// Lowercases `name` and drops everything but letters and digits.
fn normalize(name: &str) -> String {
    name.chars()
        .filter(char::is_ascii_alphanumeric)
        .map(|c| c.to_ascii_lowercase())
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Method {
    TransverseMercator,
    Mercator,
    WebMercator,
    LambertConformalConic,
    AlbersEqualArea,
    /// `north` is `None` when the hemisphere follows the latitude of true scale.
    PolarStereographic {
        north: Option<bool>,
    },
    Stereographic,
    LambertAzimuthalEqualArea,
    EquidistantCylindrical,
    EquidistantConic,
    AzimuthalEquidistant,
    Cassini,
    Sinusoidal,
    Mollweide,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Parameter {
    /// Scaled by the projected unit into metres
    Linear(&'static str),
    Plain(&'static str),
}

impl Method {
    fn from_name(name: &str) -> Option<Self> {
        Some(match name {
            "transversemercator" | "gausskruger" => Self::TransverseMercator,
            "mercator" | "mercator1sp" | "mercator2sp" => Self::Mercator,
            "mercatorauxiliarysphere" | "popularvisualisationpseudomercator" => Self::WebMercator,
            "lambertconformalconic" | "lambertconformalconic1sp" | "lambertconformalconic2sp" => {
                Self::LambertConformalConic
            },
            "albers" | "albersconicequalarea" => Self::AlbersEqualArea,
            "stereographicnorthpole" => Self::PolarStereographic { north: Some(true) },
            "stereographicsouthpole" => Self::PolarStereographic { north: Some(false) },
            "polarstereographic" => Self::PolarStereographic { north: None },
            "stereographic" | "obliquestereographic" => Self::Stereographic,
            "lambertazimuthalequalarea" => Self::LambertAzimuthalEqualArea,
            "equidistantcylindrical" | "equirectangular" | "platecarree" => {
                Self::EquidistantCylindrical
            },
            "equidistantconic" => Self::EquidistantConic,
            "azimuthalequidistant" => Self::AzimuthalEquidistant,
            "cassini" | "cassinisoldner" => Self::Cassini,
            "sinusoidal" => Self::Sinusoidal,
            "mollweide" => Self::Mollweide,
            _ => return None,
        })
    }

    fn proj(self) -> &'static str {
        match self {
            Self::TransverseMercator => "tmerc",
            Self::Mercator | Self::WebMercator => "merc",
            Self::LambertConformalConic => "lcc",
            Self::AlbersEqualArea => "aea",
            Self::PolarStereographic { .. } | Self::Stereographic => "stere",
            Self::LambertAzimuthalEqualArea => "laea",
            Self::EquidistantCylindrical => "eqc",
            Self::EquidistantConic => "eqdc",
            Self::AzimuthalEquidistant => "aeqd",
            Self::Cassini => "cass",
            Self::Sinusoidal => "sinu",
            Self::Mollweide => "moll",
        }
    }

    fn parameter(self, name: &str) -> Option<Parameter> {
        let polar = matches!(self, Self::PolarStereographic { .. });
        Some(match name {
            "falseeasting" => Parameter::Linear("x_0"),
            "falsenorthing" => Parameter::Linear("y_0"),
            "centralmeridian"
            | "longitudeofcenter"
            | "longitudeoforigin"
            | "longitudeofnaturalorigin"
            | "straightverticallongitudefromorigin" => Parameter::Plain("lon_0"),
            "latitudeoforigin" | "latitudeofcenter" | "latitudeofnaturalorigin" if polar => {
                Parameter::Plain("lat_ts")
            },
            "latitudeoforigin" | "latitudeofcenter" | "latitudeofnaturalorigin" => {
                Parameter::Plain("lat_0")
            },
            "standardparallel1" if polar || self == Self::Mercator => Parameter::Plain("lat_ts"),
            "latitudeoftruescale" => Parameter::Plain("lat_ts"),
            "standardparallel1" => Parameter::Plain("lat_1"),
            "standardparallel2" => Parameter::Plain("lat_2"),
            "scalefactor" | "scalefactoratnaturalorigin" => Parameter::Plain("k"),
            _ => return None,
        })
    }
}

struct Parser<'a> {
    text: &'a str,
    position: usize,
}

impl<'a> Parser<'a> {
    fn peek(&self) -> Option<char> {
        self.text[self.position..].chars().next()
    }

    fn bump(&mut self) -> Option<char> {
        let ch = self.peek()?;
        self.position += ch.len_utf8();
        Some(ch)
    }

    fn skip_whitespace(&mut self) {
        while self.peek().is_some_and(char::is_whitespace) {
            self.bump();
        }
    }

    fn error(&self, expected: &str) -> WktError {
        WktError::Syntax {
            position: self.position,
            message: format!("expected {expected}"),
        }
    }

    fn take_while(&mut self, accept: impl Fn(char) -> bool) -> &'a str {
        let start = self.position;
        while self.peek().is_some_and(&accept) {
            self.bump();
        }
        let text = self.text;
        &text[start..self.position]
    }

    fn word(&mut self) -> String {
        self.take_while(|c| c.is_ascii_alphanumeric() || c == '_').to_string()
    }

    fn node(&mut self) -> Result<Node, WktError> {
        self.skip_whitespace();
        let keyword = self.word();
        if keyword.is_empty() {
            return Err(self.error("keyword"));
        }
        self.skip_whitespace();
        self.node_body(keyword.to_ascii_uppercase())
    }

    fn node_body(&mut self, keyword: String) -> Result<Node, WktError> {
        let close = match self.bump() {
            Some('[') => ']',
            Some('(') => ')',
            _ => return Err(self.error("'[' or '('")),
        };

        let mut values = Vec::new();
        loop {
            self.skip_whitespace();
            if self.peek() == Some(close) && values.is_empty() {
                self.bump();
                break;
            }
            values.push(self.value()?);
            self.skip_whitespace();
            match self.bump() {
                Some(',') => {},
                Some(ch) if ch == close => break,
                _ => return Err(self.error(&format!("',' or '{close}'"))),
            }
        }
        Ok(Node { keyword, values })
    }

    fn value(&mut self) -> Result<Value, WktError> {
        match self.peek() {
            Some('"') => self.text_value(),
            Some(c) if c.is_ascii_digit() || matches!(c, '-' | '+' | '.') => {
                let start = self.position;
                let literal =
                    self.take_while(|c| c.is_ascii_digit() || matches!(c, '-' | '+' | '.' | 'e' | 'E'));
                literal.parse().map(Value::Number).map_err(|_| WktError::Syntax {
                    position: start,
                    message: format!("invalid number '{literal}'"),
                })
            },
            Some(c) if c.is_ascii_alphabetic() => {
                let word = self.word();
                self.skip_whitespace();
                if matches!(self.peek(), Some('[' | '(')) {
                    Ok(Value::Node(self.node_body(word.to_ascii_uppercase())?))
                } else {
                    Ok(Value::Word(word))
                }
            },
            _ => Err(self.error("a value")),
        }
    }

    /// Reads a quoted string, where `""` stands for one quote.
    fn text_value(&mut self) -> Result<Value, WktError> {
        self.bump();
        let mut text = String::new();
        loop {
            match self.bump() {
                Some('"') if self.peek() == Some('"') => {
                    self.bump();
                    text.push('"');
                },
                Some('"') => return Ok(Value::Text(text)),
                Some(ch) => text.push(ch),
                None => return Err(self.error("closing quote")),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ESRI_UTM_10N: &str = r#"PROJCS["NAD_1983_UTM_Zone_10N",GEOGCS["GCS_North_American_1983",DATUM["D_North_American_1983",SPHEROID["GRS_1980",6378137.0,298.257222101]],PRIMEM["Greenwich",0.0],UNIT["Degree",0.0174532925199433]],PROJECTION["Transverse_Mercator"],PARAMETER["False_Easting",500000.0],PARAMETER["False_Northing",0.0],PARAMETER["Central_Meridian",-123.0],PARAMETER["Scale_Factor",0.9996],PARAMETER["Latitude_Of_Origin",0.0],UNIT["Meter",1.0]]"#;

    fn proj4(text: &str) -> String {
        match Wkt::parse(text).unwrap().to_crs().unwrap() {
            WktCrs::Proj4(proj4) => proj4,
            WktCrs::Epsg(code) => panic!("expected a PROJ.4 string, got EPSG:{code}"),
        }
    }

    #[test]
    fn parses_nested_elements_and_bare_words() {
        let wkt = Wkt::parse(r#"GEOGCRS["A ""quoted"" name",CS(ellipsoidal,2),ID["EPSG",4326]]"#)
            .unwrap();
        assert_eq!(wkt.root.keyword, "GEOGCRS");
        assert_eq!(wkt.root.name(), Some(r#"A "quoted" name"#));
        let cs = wkt.root.child("CS").unwrap();
        assert_eq!(cs.values, vec![Value::Word("ellipsoidal".into()), Value::Number(2.0)]);
        assert_eq!(wkt.authority_code(), Some(4326));
    }

    #[test]
    fn rejects_unbalanced_brackets() {
        assert!(matches!(
            Wkt::parse(r#"GEOGCS["WGS 84",DATUM["WGS_1984""#),
            Err(WktError::Syntax { .. })
        ));
        assert!(Wkt::parse(r#"GEOGCS["a"]]"#).is_err());
    }

    #[test]
    fn candidate_requires_a_bracketed_keyword() {
        assert!(Wkt::is_candidate(ESRI_UTM_10N));
        assert!(!Wkt::is_candidate("this is not a projection"));
        assert!(!Wkt::is_candidate("+proj=longlat"));
    }

    #[test]
    fn authority_is_read_from_text_or_number() {
        let wkt = Wkt::parse(r#"PROJCS["x",GEOGCS["y",AUTHORITY["EPSG","4326"]],AUTHORITY["EPSG","32633"]]"#)
            .unwrap();
        assert_eq!(wkt.authority_code(), Some(32633));
        let inner_only = Wkt::parse(r#"PROJCS["x",GEOGCS["y",AUTHORITY["EPSG","4326"]]]"#).unwrap();
        assert_eq!(inner_only.authority_code(), None);
    }

    #[test]
    fn esri_transverse_mercator_is_spelled_out() {
        let proj4 = proj4(ESRI_UTM_10N);
        assert!(proj4.starts_with("+proj=tmerc"), "{proj4}");
        for expected in ["+x_0=500000", "+lon_0=-123", "+k=0.9996", "+lat_0=0", "+ellps=GRS80"] {
            assert!(proj4.contains(expected), "{expected} missing from {proj4}");
        }
        assert!(proj4.contains("+towgs84=0,0,0,0,0,0,0"));
        assert!(proj4.ends_with("+units=m +no_defs"));
    }

    #[test]
    fn web_mercator_maps_to_3857() {
        let wkt = Wkt::parse(r#"PROJCS["WGS_1984_Web_Mercator_Auxiliary_Sphere",GEOGCS["GCS_WGS_1984",DATUM["D_WGS_1984",SPHEROID["WGS_1984",6378137.0,298.257223563]],PRIMEM["Greenwich",0.0],UNIT["Degree",0.0174532925199433]],PROJECTION["Mercator_Auxiliary_Sphere"],PARAMETER["False_Easting",0.0],UNIT["Meter",1.0]]"#)
            .unwrap();
        assert_eq!(wkt.to_crs().unwrap(), WktCrs::Epsg(3857));
    }

    #[test]
    fn feet_scale_false_origin_into_metres() {
        let proj4 = proj4(r#"PROJCS["ft",GEOGCS["GCS_WGS_1984",DATUM["D_WGS_1984",SPHEROID["WGS_1984",6378137.0,298.257223563]],PRIMEM["Greenwich",0.0],UNIT["Degree",0.0174532925199433]],PROJECTION["Lambert_Conformal_Conic"],PARAMETER["False_Easting",2000000.0],PARAMETER["Standard_Parallel_1",33.0],PARAMETER["Standard_Parallel_2",45.0],UNIT["Foot",0.3048]]"#);
        assert!(proj4.starts_with("+proj=lcc"), "{proj4}");
        assert!(proj4.contains("+x_0=609600"), "{proj4}");
        assert!(proj4.contains("+lat_1=33 +lat_2=45"), "{proj4}");
        assert!(proj4.contains("+datum=WGS84"));
        assert!(proj4.contains("+to_meter=0.3048"));
    }

    #[test]
    fn polar_stereographic_hemisphere_follows_true_scale() {
        let proj4 = proj4(r#"PROJCS["south",GEOGCS["WGS 84",DATUM["WGS_1984",SPHEROID["WGS 84",6378137,298.257223563]]],PROJECTION["Polar_Stereographic"],PARAMETER["latitude_of_origin",-71],PARAMETER["central_meridian",0]]"#);
        assert!(proj4.contains("+lat_ts=-71"), "{proj4}");
        assert!(proj4.contains("+lat_0=-90"), "{proj4}");
    }

    #[test]
    fn unknown_datum_uses_spheroid_axes() {
        let proj4 = proj4(r#"GEOGCS["Mars",DATUM["D_Mars",SPHEROID["Mars_2000",3396190.0,169.8944472]],PRIMEM["Reference_Meridian",0.0],UNIT["Degree",0.0174532925199433]]"#);
        assert_eq!(proj4, "+proj=longlat +a=3396190 +rf=169.8944472 +no_defs");
    }

    #[test]
    fn unsupported_method_is_reported() {
        let err = Wkt::parse(r#"PROJCS["x",GEOGCS["GCS_WGS_1984",DATUM["D_WGS_1984",SPHEROID["WGS_1984",6378137.0,298.257223563]]],PROJECTION["Krovak"]]"#)
            .unwrap()
            .to_crs()
            .unwrap_err();
        assert!(err.to_string().contains("Krovak"));
    }
}
