use windows::Win32::Foundation::HWND;
use windows::Win32::Graphics::Gdi::{
    BitBlt, CreateCompatibleBitmap, CreateCompatibleDC, DeleteDC, DeleteObject, GetDC,
    GetDIBits, ReleaseDC, SelectObject, BITMAPINFO, BITMAPINFOHEADER, BI_RGB, DIB_RGB_COLORS,
    SRCCOPY,
};
use windows::Win32::Storage::Xps::{PrintWindow, PRINT_WINDOW_FLAGS, PW_CLIENTONLY};
use image::{ImageBuffer, Rgb, RgbImage};

use super::window::get_client_size;

// Not exported by the bindings; asks DWM for the composed content
const PW_RENDERFULLCONTENT: u32 = 0x0000_0002;

/// Capture the client area of a window.
///
/// Uses PrintWindow so the window may be covered or in the background. Falls
/// back to BitBlt of the client DC when the window refuses to render itself,
/// which only sees visible pixels.
pub fn capture_client(hwnd: HWND) -> Result<RgbImage, String> {
    let (width, height) = get_client_size(hwnd)
        .ok_or_else(|| "Failed to get window client area".to_string())?;
    if width <= 0 || height <= 0 {
        return Err(format!("Client area is empty ({}x{})", width, height));
    }

    unsafe {
        // Get client device context
        let hdc = GetDC(hwnd);
        if hdc.is_invalid() {
            return Err("Failed to get window device context".to_string());
        }

        let mem_dc = CreateCompatibleDC(hdc);
        if mem_dc.is_invalid() {
            let _ = ReleaseDC(hwnd, hdc);
            return Err("Failed to create compatible DC".to_string());
        }

        let bitmap = CreateCompatibleBitmap(hdc, width, height);
        if bitmap.is_invalid() {
            let _ = DeleteDC(mem_dc);
            let _ = ReleaseDC(hwnd, hdc);
            return Err("Failed to create compatible bitmap".to_string());
        }

        let old_bitmap = SelectObject(mem_dc, bitmap);

        let flags = PRINT_WINDOW_FLAGS(PW_CLIENTONLY.0 | PW_RENDERFULLCONTENT);
        let printed = PrintWindow(hwnd, mem_dc, flags).as_bool()
            || BitBlt(mem_dc, 0, 0, width, height, hdc, 0, 0, SRCCOPY).is_ok();

        if !printed {
            let _ = SelectObject(mem_dc, old_bitmap);
            let _ = DeleteObject(bitmap);
            let _ = DeleteDC(mem_dc);
            let _ = ReleaseDC(hwnd, hdc);
            return Err("PrintWindow and BitBlt both failed".to_string());
        }

        // Detach the bitmap before reading it back
        let _ = SelectObject(mem_dc, old_bitmap);

        let mut bmi = BITMAPINFO {
            bmiHeader: BITMAPINFOHEADER {
                biSize: std::mem::size_of::<BITMAPINFOHEADER>() as u32,
                biWidth: width,
                biHeight: -height, // Negative for top-down bitmap
                biPlanes: 1,
                biBitCount: 32, // BGRA, no row padding
                biCompression: BI_RGB.0 as u32,
                biSizeImage: 0,
                biXPelsPerMeter: 0,
                biYPelsPerMeter: 0,
                biClrUsed: 0,
                biClrImportant: 0,
            },
            bmiColors: [Default::default(); 1],
        };

        let mut buffer: Vec<u8> = vec![0; (width * height * 4) as usize];

        let scan_lines = GetDIBits(
            mem_dc,
            bitmap,
            0,
            height as u32,
            Some(buffer.as_mut_ptr() as *mut _),
            &mut bmi,
            DIB_RGB_COLORS,
        );

        // Cleanup GDI objects
        let _ = DeleteObject(bitmap);
        let _ = DeleteDC(mem_dc);
        let _ = ReleaseDC(hwnd, hdc);

        if scan_lines == 0 {
            return Err("Failed to get bitmap bits".to_string());
        }

        // Windows uses BGRA, we need RGB
        let img: RgbImage = ImageBuffer::from_fn(width as u32, height as u32, |x, y| {
            let idx = ((y * width as u32 + x) * 4) as usize;
            Rgb([buffer[idx + 2], buffer[idx + 1], buffer[idx]])
        });

        Ok(img)
    }
}
