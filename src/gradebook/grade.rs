/// Converts a course percentage (0–100) into a letter grade.
///
/// | Range   | Grade |
/// |---------|-------|
/// | >= 93   | A     |
/// | >= 90   | A-    |
/// | >= 87   | B+    |
/// | >= 83   | B     |
/// | >= 80   | B-    |
/// | >= 77   | C+    |
/// | >= 73   | C     |
/// | >= 70   | C-    |
/// | >= 67   | D+    |
/// | >= 63   | D     |
/// | >= 60   | D-    |
/// | < 60    | F     |
pub fn letter(p: f64) -> String {
    match p {
        p if p >= 93.0 => "A".into(),
        p if p >= 90.0 => "A-".into(),
        p if p >= 87.0 => "B+".into(),
        p if p >= 83.0 => "B".into(),
        p if p >= 80.0 => "B-".into(),
        p if p >= 77.0 => "C+".into(),
        p if p >= 73.0 => "C".into(),
        p if p >= 70.0 => "C-".into(),
        p if p >= 67.0 => "D+".into(),
        p if p >= 63.0 => "D".into(),
        p if p >= 60.0 => "D-".into(),
        _ => "F".into(),
    }
}
