//! X3D 3.3 writer (Interchange profile, XML encoding)

use super::MeshPart;
use super::xml::{face_index_list, node_name, points_list, rgb, xml_escape};

pub(crate) fn render(parts: &[MeshPart]) -> String {
    let mut out = String::new();
    out.push_str("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");
    out.push_str("<X3D profile=\"Interchange\" version=\"3.3\">\n  <Scene>\n");
    for part in parts {
        let a = &part.appearance;
        out.push_str(&format!(
            "    <Shape DEF=\"{}\">\n",
            xml_escape(&node_name(&part.name))
        ));
        out.push_str(&format!(
            "      <Appearance>\n        <Material diffuseColor=\"{}\" ambientIntensity=\"{}\" \
             specularColor=\"{}\" shininess=\"{}\" emissiveColor=\"{}\" transparency=\"{}\"/>\n      </Appearance>\n",
            rgb(a.diffuse_color()),
            a.ambient_intensity(),
            rgb(a.specular_color()),
            a.shininess(),
            rgb(a.emissive_color()),
            a.transparency(),
        ));
        out.push_str(&format!(
            "      <IndexedFaceSet coordIndex=\"{}\">\n",
            face_index_list(&part.mesh.indices, " ")
        ));
        out.push_str(&format!(
            "        <Coordinate point=\"{}\"/>\n",
            points_list(&part.mesh.vertices, " ")
        ));
        out.push_str("      </IndexedFaceSet>\n    </Shape>\n");
    }
    out.push_str("  </Scene>\n</X3D>\n");
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::appearance::Appearance;
    use e3d_cad::TessellatedMesh;

    #[test]
    fn test_document_structure() {
        let parts = [MeshPart {
            name: "cube5x5x5_Body".into(),
            appearance: Appearance::new([1.0, 0.0, 0.0]),
            mesh: TessellatedMesh {
                vertices: vec![[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]],
                normals: vec![[0.0, 0.0, 1.0]; 3],
                indices: vec![0, 1, 2],
            },
        }];
        let text = render(&parts);
        assert!(text.contains("<X3D profile=\"Interchange\" version=\"3.3\">"));
        assert!(text.contains("<Shape DEF=\"cube5x5x5_Body\">"));
        assert!(text.contains("diffuseColor=\"1 0 0\""));
        assert!(text.contains("coordIndex=\"0 1 2 -1\""));
        assert!(text.contains("point=\"0 0 0 1 0 0 0 1 0\""));
        assert!(text.trim_end().ends_with("</X3D>"));
    }

    #[test]
    fn test_empty_scene() {
        let text = render(&[]);
        assert!(!text.contains("<Shape"));
        assert!(text.contains("<Scene>"));
    }
}
