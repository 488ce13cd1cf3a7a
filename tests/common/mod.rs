//! Shared fixture: a small packaged app with two features and one image

#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

use tempfile::TempDir;

pub const BUNDLE: &str = r#"!function(e){e.__DEV__=false,e.__BUNDLE_START_TIME__=e.nativePerformanceNow?e.nativePerformanceNow():Date.now(),e.process=e.process||{},e.process.env=e.process.env||{},e.process.env.NODE_ENV='production'}(this);
!function(e){"use strict";e.require=function(t){return t};if(__DEV__&&'function'==typeof e.nativeRequire){e.nativeRequire=e.require}}(this);
__d(function(e,r,t,n){t.exports={View:'View',AppRegistry:require(8),AssetRegistry:require(7)}},12,[8,7],"react-native-implementation");
__d(function(e,r,t,n){var i=require(12);require(100);require(200)},0,[12,100,200],"split-example/index.android.js.tmp");
__d(function(e,r,t,n){var i=require(12),o=require(101);i.AppRegistry.registerComponent('SampleA',function(){return o})},100,[12,101],"split-example/src/components/packagea/SampleA.js");
__d(function(e,r,t,n){t.exports=require(7).registerAsset({"__packager_asset":true,"httpServerLocation":"/assets/src/components/packagea/images","width":960,"height":540,"scales":[1,2],"hash":"58152c62118ac492f12163c5521041fd","name":"naruto","type":"jpeg"})},101,[7],"split-example/src/components/packagea/images/naruto.jpeg");
__d(function(e,r,t,n){var i=require(12),o=require(201);i.AppRegistry.registerComponent('SampleB',function(){return o})},200,[12,201],"split-example/src/components/packageb/SampleB.js");
__d(function(e,r,t,n){t.exports={label:'B'}},201,[],"split-example/src/components/packageb/label.js");
__d(function(e,r,t,n){t.exports={registerAsset:function(a){return a}}},7,[],"AssetRegistry");
__d(function(e,r,t,n){t.exports={registerComponent:function(){}}},8,[],"AppRegistry");
require(12);
require(0);"#;

pub const CONFIG: &str = r#"
package = "split-example"
platform = "android"

[input]
bundle = "bundle/index.android.bundle"
assets = "bundle"

[output]
dir = "split"

[base]
index = "index.android.js"

[[custom]]
name = "packagea"
index = "src/components/packagea/SampleA.js"

[[custom]]
name = "packageb"
index = "src/components/packageb/SampleB.js"
"#;

pub const ASSET_FILES: &[&str] = &[
    "drawable-mdpi/src_components_packagea_images_naruto.jpeg",
    "drawable-xhdpi/src_components_packagea_images_naruto.jpeg",
];

/// A project directory holding the config, the bundle and its assets
pub struct Project {
    pub dir: TempDir,
}

impl Project {
    pub fn new(bundle: &str) -> Self {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("splitpack.toml"), CONFIG).unwrap();
        fs::create_dir_all(dir.path().join("bundle")).unwrap();
        fs::write(dir.path().join("bundle/index.android.bundle"), bundle).unwrap();
        Self { dir }
    }

    pub fn with_assets(self) -> Self {
        for file in ASSET_FILES {
            let path = self.dir.path().join("bundle").join(file);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(&path, file).unwrap();
        }
        self
    }

    pub fn path(&self, relative: &str) -> PathBuf {
        self.dir.path().join(relative)
    }

    pub fn config_path(&self) -> PathBuf {
        self.path("splitpack.toml")
    }

    pub fn read(&self, relative: &str) -> String {
        fs::read_to_string(self.path(relative)).unwrap()
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }
}
