//! I/O operations for reading and writing GeoTIFF rasters

mod native;

pub use native::{
    read_geotiff, read_geotiff_from_buffer, read_geotiff_stack, read_geotiff_stack_from_buffer,
    write_geotiff, write_geotiff_stack_u8, write_geotiff_stack_u8_to_buffer,
    write_geotiff_to_buffer, write_geotiff_u8,
};
