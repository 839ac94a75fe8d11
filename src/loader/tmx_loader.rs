// src/loader/tmx_loader.rs
use crate::cache::TileCache;
use crate::error::{LayerDecodeError, MapError};
use crate::gid::{resolve, TileId};
use crate::hooks::MapHooks;
use crate::layer::{Compression, Encoding, Layer, LayerGrid};
use crate::map::{Map, Named, Structure};
use crate::object::{MapObject, ObjectGroup};
use crate::options::{MapOptions, ScaleMode};
use crate::properties::{PropertyTable, PropertyValue};
use crate::tileset::{tiles_along, TileSet};
use macroquad::prelude::vec2;
use roxmltree::{Document, Node};
use std::collections::{HashMap, HashSet};
use std::str::FromStr;

/// Reads the text of an external tile set given its `source` attribute.
pub(crate) type ExternalSource<'a> = dyn FnMut(&str) -> Result<String, MapError> + 'a;

fn structure_error(node: &Node, msg: impl Into<String>) -> MapError {
    MapError::Structure {
        tag: node.tag_name().name().to_string(),
        msg: msg.into(),
    }
}

fn attribute<T: FromStr>(node: &Node, name: &str) -> Result<T, MapError> {
    let raw = node
        .attribute(name)
        .ok_or_else(|| structure_error(node, format!("required attribute '{name}' missing")))?;
    raw.parse()
        .map_err(|_| structure_error(node, format!("attribute '{name}' has invalid value '{raw}'")))
}

fn attribute_or<T: FromStr>(node: &Node, name: &str, alternative: T) -> Result<T, MapError> {
    match node.attribute(name) {
        None => Ok(alternative),
        Some(_) => attribute(node, name),
    }
}

fn flag_or(node: &Node, name: &str, alternative: bool) -> Result<bool, MapError> {
    attribute_or::<u8>(node, name, alternative as u8).map(|v| v != 0)
}

fn child<'a, 'input>(node: &Node<'a, 'input>, tag: &str) -> Option<Node<'a, 'input>> {
    node.children().find(|n| n.has_tag_name(tag))
}

fn children<'a, 'input: 'a>(node: &Node<'a, 'input>, tag: &'a str) -> impl Iterator<Item = Node<'a, 'input>> + 'a {
    node.children().filter(move |n| n.has_tag_name(tag))
}

/// Parses the `<properties>` child of `node`, if any.
pub(crate) fn properties_from_xml(node: &Node) -> Result<PropertyTable, MapError> {
    let Some(block) = child(node, "properties") else {
        return Ok(PropertyTable::new());
    };

    let mut seen = HashSet::new();
    let mut entries = Vec::new();
    for p in children(&block, "property") {
        let name: String = attribute(&p, "name")?;
        if !seen.insert(name.clone()) {
            return Err(MapError::DuplicateName { kind: "property", name });
        }
        // Multi-line strings are stored as element text instead of `value`.
        let literal = p.attribute("value").or_else(|| p.text()).unwrap_or_default();
        let value = PropertyValue::parse(&name, p.attribute("type"), literal)?;
        entries.push((name, value));
    }
    Ok(entries.into_iter().collect())
}

/// `opacity` attribute, defaulting to 1 and limited to `0.0..=1.0`.
fn opacity(node: &Node) -> Result<f32, MapError> {
    let value: f32 = attribute_or(node, "opacity", 1.0)?;
    if !(0.0..=1.0).contains(&value) {
        return Err(structure_error(node, format!("opacity {value} is outside 0..1")));
    }
    Ok(value)
}

fn tile_set_from_xml(first_gid: u32, node: Node) -> Result<TileSet, MapError> {
    if !node.has_tag_name("tileset") {
        return Err(structure_error(&node, "expected a <tileset> root element"));
    }

    let name: String = attribute_or(&node, "name", String::new())?;
    let tile_w: u32 = attribute(&node, "tilewidth")?;
    let tile_h: u32 = attribute(&node, "tileheight")?;
    let spacing: u32 = attribute_or(&node, "spacing", 0)?;
    let margin: u32 = attribute_or(&node, "margin", 0)?;

    let image = child(&node, "image")
        .ok_or_else(|| structure_error(&node, format!("tile set '{name}': image collection tile sets are not supported")))?;
    let source: String = attribute(&image, "source")?;
    let image_w: Option<u32> = image.attribute("width").map(|_| attribute(&image, "width")).transpose()?;
    let image_h: Option<u32> = image.attribute("height").map(|_| attribute(&image, "height")).transpose()?;

    let columns = match node.attribute("columns") {
        Some(_) => attribute(&node, "columns")?,
        None => image_w.map(|w| tiles_along(w, tile_w, margin, spacing)).unwrap_or(0),
    };
    let tile_count = match node.attribute("tilecount") {
        Some(_) => attribute(&node, "tilecount")?,
        None => match image_h {
            Some(h) if columns > 0 => columns * tiles_along(h, tile_h, margin, spacing),
            _ => {
                return Err(structure_error(
                    &node,
                    format!("tile set '{name}' has no tilecount and no image size to derive it from"),
                ))
            }
        },
    };
    if columns == 0 && tile_count > 0 {
        return Err(structure_error(&node, format!("tile set '{name}' has no columns")));
    }

    let mut tiles = HashMap::new();
    for tile in children(&node, "tile") {
        let props = properties_from_xml(&tile)?;
        if !props.is_empty() {
            tiles.insert(attribute::<u32>(&tile, "id")?, props);
        }
    }

    Ok(
        TileSet::new(name, first_gid, tile_count, columns, tile_w, tile_h, margin, spacing, source)
            .with_properties(properties_from_xml(&node)?)
            .with_tile_properties(tiles),
    )
}

fn layer_from_xml(node: &Node, map_w: u32, map_h: u32) -> Result<Layer, MapError> {
    let name: String = attribute_or(node, "name", String::new())?;
    let decode_err = |source: LayerDecodeError| MapError::LayerDecode {
        layer: name.clone(),
        source,
    };

    let width: u32 = attribute_or(node, "width", map_w)?;
    let height: u32 = attribute_or(node, "height", map_h)?;
    if (width, height) != (map_w, map_h) {
        return Err(decode_err(LayerDecodeError::SizeMismatch {
            width: map_w,
            height: map_h,
            found_w: width,
            found_h: height,
        }));
    }

    let data = child(node, "data").ok_or_else(|| decode_err(LayerDecodeError::MissingData))?;
    let encoding = match data.attribute("encoding") {
        None => Encoding::Xml,
        Some(e) => e.parse().map_err(decode_err)?,
    };
    let compression = match data.attribute("compression") {
        None => Compression::None,
        Some(c) => c.parse().map_err(decode_err)?,
    };

    let grid = match encoding {
        Encoding::Xml => {
            if compression != Compression::None {
                let marker = data.attribute("compression").unwrap_or_default();
                return Err(decode_err(LayerDecodeError::CompressionWithoutBase64(marker.to_owned())));
            }
            let gids = children(&data, "tile")
                .map(|t| {
                    let raw = t.attribute("gid").unwrap_or("0");
                    raw.parse::<u32>()
                        .map_err(|_| LayerDecodeError::InvalidGid(raw.to_owned()))
                })
                .collect::<Result<Vec<_>, _>>()
                .map_err(decode_err)?;
            LayerGrid::from_gids(width, height, gids)
        }
        _ => LayerGrid::decode(width, height, encoding, compression, data.text().unwrap_or_default()),
    }
    .map_err(decode_err)?;

    Ok(Layer {
        opacity: opacity(node)?,
        visible: flag_or(node, "visible", true)?,
        properties: properties_from_xml(node)?,
        grid,
        name,
    })
}

fn object_group_from_xml<H: MapHooks>(
    node: &Node,
    tile_sets: &[TileSet],
    scale: ScaleMode,
    hooks: &mut H,
) -> Result<ObjectGroup<H::Object>, MapError> {
    let group: String = attribute_or(node, "name", String::new())?;

    let mut objects = Vec::new();
    for obj in children(node, "object") {
        let gid = obj
            .attribute("gid")
            .map(|_| attribute::<u32>(&obj, "gid").map(TileId))
            .transpose()?;
        let tile = match gid {
            Some(id) => resolve(id, tile_sets)?,
            None => None,
        };

        // Tile objects default to the size of their tile.
        let (default_w, default_h) = tile
            .map(|t| (tile_sets[t.tile_set].tile_w as f32, tile_sets[t.tile_set].tile_h as f32))
            .unwrap_or((0.0, 0.0));

        let name: String = attribute_or(&obj, "name", String::new())?;
        let properties = properties_from_xml(&obj)?;
        let data = hooks.on_object(&name, &group, &properties);

        objects.push(MapObject {
            id: attribute_or(&obj, "id", 0)?,
            kind: attribute_or(&obj, "type", String::new())?,
            position: scale.apply(vec2(attribute_or(&obj, "x", 0.0)?, attribute_or(&obj, "y", 0.0)?)),
            size: scale.apply(vec2(
                attribute_or(&obj, "width", default_w)?,
                attribute_or(&obj, "height", default_h)?,
            )),
            rotation: attribute_or(&obj, "rotation", 0.0)?,
            visible: flag_or(&obj, "visible", true)?,
            gid,
            tile,
            properties,
            data,
            name,
        });
    }

    Ok(ObjectGroup {
        color: node.attribute("color").map(str::to_owned),
        opacity: opacity(node)?,
        visible: flag_or(node, "visible", true)?,
        properties: properties_from_xml(node)?,
        objects,
        name: group,
    })
}

fn check_unique<T: Named>(items: &[T]) -> Result<(), MapError> {
    let mut seen = HashSet::new();
    for item in items {
        if !seen.insert(item.name()) {
            return Err(MapError::DuplicateName {
                kind: T::KIND,
                name: item.name().to_owned(),
            });
        }
    }
    Ok(())
}

/// Sorts by `first_gid` and rejects overlapping GID ranges.
fn sort_tile_sets(tile_sets: &mut [TileSet]) -> Result<(), MapError> {
    tile_sets.sort_by_key(|t| t.first_gid);
    for pair in tile_sets.windows(2) {
        let end = pair[0].first_gid as u64 + pair[0].tile_count as u64;
        if pair[0].first_gid == pair[1].first_gid || end > pair[1].first_gid as u64 {
            return Err(MapError::OverlappingTileSets {
                first: pair[0].name.clone(),
                second: pair[1].name.clone(),
            });
        }
    }
    Ok(())
}

/// Parses a TMX document into a [`Map`] with a built tile cache.
pub(crate) fn decode_map<H: MapHooks>(
    text: &str,
    options: &MapOptions,
    hooks: &mut H,
    external: &mut ExternalSource,
) -> Result<Map<H::Object>, MapError> {
    options.validate()?;

    let doc = Document::parse(text)?;
    let root = doc.root_element();
    if !root.has_tag_name("map") {
        return Err(structure_error(&root, "expected a <map> root element"));
    }

    let version = root.attribute("version").unwrap_or_default();
    if version != "1.0" {
        return Err(MapError::UnsupportedVersion(version.to_owned()));
    }
    let orientation = root.attribute("orientation").unwrap_or_default();
    if orientation != "orthogonal" {
        return Err(MapError::UnsupportedOrientation(orientation.to_owned()));
    }

    let width: u32 = attribute(&root, "width")?;
    let height: u32 = attribute(&root, "height")?;
    let tile_width: u32 = attribute(&root, "tilewidth")?;
    let tile_height: u32 = attribute(&root, "tileheight")?;
    if tile_width == 0 || tile_height == 0 {
        return Err(structure_error(&root, "tile dimensions must be non-zero"));
    }
    let scale = options.scale_units.resolve(tile_width, tile_height);

    let properties = properties_from_xml(&root)?;

    let mut tile_sets = Vec::new();
    for node in children(&root, "tileset") {
        let first_gid: u32 = attribute(&node, "firstgid")?;
        if first_gid == 0 {
            return Err(structure_error(&node, "firstgid must be at least 1"));
        }
        let tile_set = match node.attribute("source") {
            Some(source) => {
                let ext_text = external(source)?;
                let ext = Document::parse(&ext_text)?;
                tile_set_from_xml(first_gid, ext.root_element())?
            }
            None => tile_set_from_xml(first_gid, node)?,
        };
        tile_sets.push(tile_set);
    }
    check_unique(&tile_sets)?;
    sort_tile_sets(&mut tile_sets)?;

    let layers = children(&root, "layer")
        .map(|node| layer_from_xml(&node, width, height))
        .collect::<Result<Vec<_>, _>>()?;
    check_unique(&layers)?;

    let object_groups = children(&root, "objectgroup")
        .map(|node| object_group_from_xml(&node, &tile_sets, scale, hooks))
        .collect::<Result<Vec<_>, _>>()?;
    check_unique(&object_groups)?;

    let mut cache = TileCache::new(width, height, tile_width, tile_height, scale);
    cache.rebuild(&tile_sets, &layers)?;

    log::info!(
        "Loaded {width}x{height} TMX map ({tile_width}x{tile_height} px tiles): {} tile sets, {} layers, {} object groups, {} cached tiles",
        tile_sets.len(),
        layers.len(),
        object_groups.len(),
        cache.tile_count()
    );
    if cache.tile_count() > 0 && cache.layers().iter().all(|l| !l.visible()) {
        log::warn!("every tile layer is hidden; draw() will emit nothing");
    }

    let mut map = Map {
        width,
        height,
        tile_width,
        tile_height,
        properties,
        scale,
        tile_sets: Structure::Retained(tile_sets),
        layers: Structure::Retained(layers),
        object_groups: Structure::Retained(object_groups),
        cache,
    };
    map.apply_discards(options);
    Ok(map)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hooks::PassThrough;

    fn no_external(source: &str) -> Result<String, MapError> {
        Err(MapError::ExternalTileSet(source.to_owned()))
    }

    fn decode(text: &str) -> Result<Map<PropertyTable>, MapError> {
        decode_map(text, &MapOptions::unscaled(), &mut PassThrough, &mut no_external)
    }

    #[test]
    fn derives_tile_count_and_columns_from_image_size() {
        let tmx = r#"<map version="1.0" orientation="orthogonal" width="1" height="1" tilewidth="16" tileheight="16">
            <tileset firstgid="1" name="t" tilewidth="16" tileheight="16" spacing="1" margin="2">
              <image source="t.png" width="54" height="37"/>
            </tileset>
            <layer name="g" width="1" height="1"><data encoding="csv">6</data></layer>
        </map>"#;
        let map = decode(tmx).unwrap();
        let ts = &map.tile_sets().unwrap()[0];
        assert_eq!((ts.columns, ts.tile_count), (3, 6));
    }

    #[test]
    fn reads_per_tile_properties() {
        let tmx = r#"<map version="1.0" orientation="orthogonal" width="1" height="1" tilewidth="8" tileheight="8">
            <tileset firstgid="1" name="t" tilewidth="8" tileheight="8" tilecount="4" columns="2">
              <image source="t.png"/>
              <tile id="2"><properties><property name="damage" type="int" value="10"/></properties></tile>
              <tile id="3"/>
            </tileset>
        </map>"#;
        let map = decode(tmx).unwrap();
        let ts = &map.tile_sets().unwrap()[0];
        assert_eq!(ts.tile_properties(2).and_then(|p| p.get_i64("damage")), Some(10));
        assert!(ts.tile_properties(3).is_none());
    }

    #[test]
    fn multiline_string_property_uses_element_text() {
        let tmx = r#"<map version="1.0" orientation="orthogonal" width="1" height="1" tilewidth="8" tileheight="8">
            <properties><property name="intro">line one
line two</property></properties>
        </map>"#;
        let map = decode(tmx).unwrap();
        assert_eq!(map.properties.get_string("intro"), Some("line one\nline two"));
    }

    #[test]
    fn overlapping_tile_sets_are_rejected() {
        let tmx = r#"<map version="1.0" orientation="orthogonal" width="1" height="1" tilewidth="8" tileheight="8">
            <tileset firstgid="1" name="a" tilewidth="8" tileheight="8" tilecount="10" columns="5"><image source="a.png"/></tileset>
            <tileset firstgid="5" name="b" tilewidth="8" tileheight="8" tilecount="2" columns="2"><image source="b.png"/></tileset>
        </map>"#;
        assert!(matches!(decode(tmx), Err(MapError::OverlappingTileSets { .. })));
    }

    #[test]
    fn external_tile_set_without_a_file_is_reported() {
        let tmx = r#"<map version="1.0" orientation="orthogonal" width="1" height="1" tilewidth="8" tileheight="8">
            <tileset firstgid="1" source="ground.tsx"/>
        </map>"#;
        assert!(matches!(decode(tmx), Err(MapError::ExternalTileSet(s)) if s == "ground.tsx"));
    }

    #[test]
    fn repeated_property_name_is_rejected() {
        let tmx = r#"<map version="1.0" orientation="orthogonal" width="1" height="1" tilewidth="8" tileheight="8">
            <properties>
              <property name="music" value="a.ogg"/>
              <property name="music" value="b.ogg"/>
            </properties>
        </map>"#;
        assert!(matches!(
            decode(tmx),
            Err(MapError::DuplicateName { kind: "property", ref name }) if name == "music"
        ));
    }

    #[test]
    fn opacity_outside_unit_range_is_rejected() {
        for value in ["2", "-0.5", "NaN"] {
            let tmx = format!(
                r#"<map version="1.0" orientation="orthogonal" width="1" height="1" tilewidth="8" tileheight="8">
            <objectgroup name="o" opacity="{value}"/>
        </map>"#
            );
            assert!(
                matches!(decode(&tmx), Err(MapError::Structure { ref tag, .. }) if tag == "objectgroup"),
                "{value}"
            );
        }
    }

    #[test]
    fn missing_required_attribute_is_a_structure_error() {
        let tmx = r#"<map version="1.0" orientation="orthogonal" width="1" tilewidth="8" tileheight="8"/>"#;
        assert!(matches!(decode(tmx), Err(MapError::Structure { tag, .. }) if tag == "map"));
    }
}
