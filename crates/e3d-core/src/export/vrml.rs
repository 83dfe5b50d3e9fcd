//! VRML 2.0 writer

use super::MeshPart;
use super::xml::{face_index_list, node_name, points_list, rgb};

pub(crate) fn render(parts: &[MeshPart]) -> String {
    let mut out = String::from("#VRML V2.0 utf8\n\n");
    for part in parts {
        let a = &part.appearance;
        out.push_str(&format!("DEF {} Shape {{\n", node_name(&part.name)));
        out.push_str("  appearance Appearance {\n    material Material {\n");
        out.push_str(&format!("      diffuseColor {}\n", rgb(a.diffuse_color())));
        out.push_str(&format!("      ambientIntensity {}\n", a.ambient_intensity()));
        out.push_str(&format!("      specularColor {}\n", rgb(a.specular_color())));
        out.push_str(&format!("      shininess {}\n", a.shininess()));
        out.push_str(&format!("      emissiveColor {}\n", rgb(a.emissive_color())));
        out.push_str(&format!("      transparency {}\n", a.transparency()));
        out.push_str("    }\n  }\n");
        out.push_str("  geometry IndexedFaceSet {\n");
        out.push_str(&format!(
            "    coord Coordinate {{ point [ {} ] }}\n",
            points_list(&part.mesh.vertices, ", ")
        ));
        out.push_str(&format!(
            "    coordIndex [ {} ]\n",
            face_index_list(&part.mesh.indices, ", ")
        ));
        out.push_str("  }\n}\n");
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::appearance::Appearance;
    use e3d_cad::TessellatedMesh;

    #[test]
    fn test_shape_per_part() {
        let mesh = TessellatedMesh {
            vertices: vec![[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]],
            normals: vec![[0.0, 0.0, 1.0]; 3],
            indices: vec![0, 1, 2],
        };
        let parts = [
            MeshPart {
                name: "DIP08_body".into(),
                appearance: Appearance::new([0.1; 3]).with_transparency(0.5),
                mesh: mesh.clone(),
            },
            MeshPart {
                name: "DIP08_pins".into(),
                appearance: Appearance::new([0.9; 3]),
                mesh,
            },
        ];
        let text = render(&parts);
        assert!(text.starts_with("#VRML V2.0 utf8"));
        assert_eq!(text.matches(" Shape {").count(), 2);
        assert!(text.contains("DEF DIP08_body Shape"));
        assert!(text.contains("transparency 0.5"));
        assert!(text.contains("ambientIntensity 0.2"));
        assert!(text.contains("coordIndex [ 0 1 2 -1 ]"));
    }
}
