/// Frame-rate overlay text and the periodic frontend FPS notification.
pub mod fps_tracking;
