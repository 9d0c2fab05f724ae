#![allow(dead_code)]

//! On-disk reference site used by end-to-end tests.

use std::fs;
use std::io;
use std::path::Path;

pub const INDEX_HTML: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<link rel="stylesheet" href="css/style.css">
</head>
<body>
@@include('html/header.html', {"title": "Home"})
<main>
<p>Hello</p>
</main>
<!--DEV
<div class="debug">grid overlay</div>
-->
<script src="js/script-min.js"></script>
</body>
</html>
"#;

pub const HEADER_HTML: &str = "<header>\n<h1>@@title</h1>\n</header>\n";

pub const STYLE_SCSS: &str = r#"@import "variables";

body {
  color: $main;
  user-select: none;
}

@media (min-width: 768px) {
  .wide { color: red; }
}

.narrow { color: blue; }

@media (min-width: 480px) {
  .medium { color: green; }
}

@media (min-width: 768px) {
  .wider { color: black; }
}
"#;

pub const VARIABLES_SCSS: &str = "$main: #333333;\n";

pub const SCRIPT_JS: &str = r#"@@include('parts/greet.js')
function main() {
  var message = greet("world");
  console.log(message);
}
main();
"#;

pub const GREET_JS: &str = r#"function greet(name) {
  return "Hello, " + name;
}
"#;

pub const ICON_SVG: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<!-- exported by an editor -->
<svg xmlns="http://www.w3.org/2000/svg" viewBox="0 0 10 10">
  <metadata>generator info</metadata>
  <rect width="10" height="10"/>
</svg>
"#;

/// Write `content` to `root/rel`, creating parent directories.
pub fn write_file(root: &Path, rel: &str, content: impl AsRef<[u8]>) -> io::Result<()> {
    let path = root.join(rel);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, content)
}

/// Lay out a complete `src/` tree plus a preserved `build/readme.md`.
pub fn write_reference_site(root: &Path) -> io::Result<()> {
    write_file(root, "src/index.html", INDEX_HTML)?;
    write_file(root, "src/html/header.html", HEADER_HTML)?;
    write_file(root, "src/sass/style.scss", STYLE_SCSS)?;
    write_file(root, "src/sass/_variables.scss", VARIABLES_SCSS)?;
    write_file(root, "src/js/script.js", SCRIPT_JS)?;
    write_file(root, "src/js/parts/greet.js", GREET_JS)?;
    write_file(root, "src/img/logo.png", b"\x89PNG\r\n\x1a\nnot-really-a-png")?;
    write_file(root, "src/img/icon.svg", ICON_SVG)?;
    write_file(root, "src/img/nested/skip.png", b"nested")?;
    write_file(root, "src/fonts/open/open.woff2", b"wOF2-font")?;
    write_file(root, "src/fonts/open.woff", b"wOFF-font")?;
    write_file(root, "build/readme.md", "# build output\n")?;
    Ok(())
}
